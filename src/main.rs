mod ui;

use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin, Write},
    path::PathBuf,
    sync::{mpsc::Sender, Arc, Mutex},
    time::Duration,
};

use chrono::Utc;
use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use crossterm::{
    cursor::Show,
    event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use keyrace::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    engine::SessionEngine,
    identity::{LocalIdentity, User},
    lang::Language,
    leaderboard::{
        format_profile, format_table, load_profile, paginate, ENTRIES_PER_PAGE, LEADERBOARD_LIMIT,
    },
    record::{sample_records, ResultRecord},
    runtime::{
        CrosstermEventSource, FixedTicker, Metronome, RaceEvent, RaceEventSource, Runner,
    },
    session::DurationMode,
    store::{ScoreStore, SqliteScoreStore},
    submit::StoreSubmitter,
    text_supply::{FixedText, TextSource, WordGenerator},
    typing_policy::Keystroke,
};

const POLL_MS: u64 = 100;

/// timed typing test with live wpm, accuracy scoring and a shared leaderboard
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A timed typing test for the terminal. Type the scrolling text before the clock runs out; results that clear the quality floor are saved to a local leaderboard."
)]
pub struct Cli {
    /// test length in seconds (30 and 60 have leaderboards)
    #[clap(short = 'm', long, value_parser = clap::value_parser!(u32).range(1..))]
    mode: Option<u32>,

    /// append punctuation marks to some words
    #[clap(long, num_args = 0..=1, default_missing_value = "true")]
    punctuation: Option<bool>,

    /// replace some words with digits
    #[clap(long, num_args = 0..=1, default_missing_value = "true")]
    numbers: Option<bool>,

    /// custom text to type instead of random words
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// sign in as this email so results are saved
    #[clap(short = 'e', long)]
    email: Option<String>,

    /// scores database to use
    #[clap(long, global = true)]
    db: Option<PathBuf>,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// print the best score per user for a mode
    Leaderboard {
        #[clap(short = 'm', long, default_value_t = 30)]
        mode: u32,
        #[clap(long, default_value_t = LEADERBOARD_LIMIT)]
        limit: usize,
        #[clap(long, default_value_t = 1)]
        page: usize,
    },
    /// print a user's best results and ranks
    Profile { name: String },
    /// change the name shown on all of a user's scores
    Rename {
        #[clap(long)]
        email: String,
        new_name: String,
    },
    /// add sample scores to the leaderboard
    Seed,
}

impl Cli {
    /// Flags given on the command line win over the saved config
    fn apply(&self, mut config: Config) -> Config {
        if let Some(secs) = self.mode {
            config.mode_secs = DurationMode::from_secs(secs).secs();
        }
        if let Some(punctuation) = self.punctuation {
            config.punctuation = punctuation;
        }
        if let Some(numbers) = self.numbers {
            config.numbers = numbers;
        }
        if let Some(email) = &self.email {
            config.email = Some(email.trim().to_lowercase());
        }
        config
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Typing,
    Results,
    Leaderboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug, Default)]
pub struct LeaderboardView {
    pub mode: DurationMode,
    pub page: usize,
    pub rows: Vec<ResultRecord>,
    pub error: Option<String>,
}

impl LeaderboardView {
    fn total_pages(&self) -> usize {
        paginate(&self.rows, 1, ENTRIES_PER_PAGE).total_pages
    }
}

pub struct App {
    pub engine: SessionEngine,
    pub state: AppState,
    pub config: Config,
    pub leaderboard: LeaderboardView,
    store: Arc<dyn ScoreStore>,
    ticks: Sender<RaceEvent>,
    metronome: Option<Metronome>,
    generation: u64,
    last_text: String,
    fixed_text: bool,
}

impl App {
    pub fn new(
        mut engine: SessionEngine,
        store: Arc<dyn ScoreStore>,
        config: Config,
        ticks: Sender<RaceEvent>,
        fixed_text: bool,
    ) -> Self {
        engine.restart(config.mode());
        let last_text = engine.session().target_text();

        Self {
            engine,
            state: AppState::Typing,
            config,
            leaderboard: LeaderboardView::default(),
            store,
            ticks,
            metronome: None,
            generation: 0,
            last_text,
            fixed_text,
        }
    }

    pub fn on_event(&mut self, event: RaceEvent) -> Flow {
        match event {
            RaceEvent::Key(key) => return self.on_key(key),
            RaceEvent::Tick(generation) => self.on_tick(generation),
            RaceEvent::Resize => {}
        }
        Flow::Continue
    }

    fn on_key(&mut self, key: KeyEvent) -> Flow {
        if key.kind == KeyEventKind::Release {
            return Flow::Continue;
        }
        match key.code {
            KeyCode::Esc => return Flow::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Flow::Quit
            }
            KeyCode::Tab => {
                self.new_text();
                return Flow::Continue;
            }
            _ => {}
        }

        match self.state {
            AppState::Typing => {
                if let Some(keystroke) = Keystroke::from_key_event(key) {
                    self.engine.on_keystroke(keystroke);
                    self.sync_metronome();
                }
            }
            AppState::Results => match key.code {
                KeyCode::Char('r') => self.retry(),
                KeyCode::Char('n') => self.new_text(),
                KeyCode::Char('l') => self.open_leaderboard(self.engine.mode()),
                _ => {}
            },
            AppState::Leaderboard => match key.code {
                KeyCode::Char('m') => self.open_leaderboard(self.leaderboard.mode.toggled()),
                KeyCode::Char('r') => self.load_leaderboard(self.leaderboard.page),
                KeyCode::Left | KeyCode::Up => {
                    self.load_leaderboard(self.leaderboard.page.saturating_sub(1));
                }
                KeyCode::Right | KeyCode::Down => {
                    self.load_leaderboard(self.leaderboard.page + 1);
                }
                KeyCode::Char('b') | KeyCode::Backspace => {
                    self.state = if self.engine.has_finished() {
                        AppState::Results
                    } else {
                        AppState::Typing
                    };
                }
                _ => {}
            },
        }
        Flow::Continue
    }

    fn on_tick(&mut self, generation: u64) {
        if self.metronome.as_ref().map(Metronome::generation) != Some(generation) {
            tracing::debug!(generation, "stale tick dropped");
            return;
        }
        self.engine.on_tick();
        self.sync_metronome();
    }

    /// Start ticking once the engine runs; stop and show results once done
    fn sync_metronome(&mut self) {
        if self.engine.has_finished() {
            self.metronome = None;
            self.state = AppState::Results;
        } else if self.engine.is_running() && self.metronome.is_none() {
            self.generation += 1;
            self.metronome = Some(Metronome::start(
                self.ticks.clone(),
                FixedTicker::every_second(),
                self.generation,
            ));
        }
    }

    pub fn is_ticking(&self) -> bool {
        self.metronome.is_some()
    }

    /// Same text again
    fn retry(&mut self) {
        self.metronome = None;
        self.engine.start(&self.last_text, self.config.mode());
        self.state = AppState::Typing;
    }

    fn new_text(&mut self) {
        if self.fixed_text {
            self.retry();
            return;
        }
        self.metronome = None;
        self.engine.restart(self.config.mode());
        self.last_text = self.engine.session().target_text();
        self.state = AppState::Typing;
    }

    fn open_leaderboard(&mut self, mode: DurationMode) {
        self.leaderboard.mode = mode;
        self.load_leaderboard(1);
        self.state = AppState::Leaderboard;
    }

    /// Re-queries the current mode and moves to `page`, clamped to the fresh row count
    fn load_leaderboard(&mut self, page: usize) {
        let mode = self.leaderboard.mode;
        let (rows, error) = match self.store.query_top(mode, LEADERBOARD_LIMIT) {
            Ok(rows) => (rows, None),
            Err(e) => {
                tracing::warn!(error = %e, %mode, "failed to load leaderboard");
                (Vec::new(), Some(e.to_string()))
            }
        };
        self.leaderboard.rows = rows;
        self.leaderboard.error = error;
        self.leaderboard.page = page.clamp(1, self.leaderboard.total_pages());
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("keyrace=info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let path = AppDirs::log_path();
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .with(env_filter)
                .init();
            tracing::debug!(path = %path.display(), "logging initialized");
        }
        // the terminal belongs to the UI, so no log file means no logs
        Err(_) => tracing_subscriber::registry().with(env_filter).init(),
    }
}

fn run_command<W: Write>(
    command: &Command,
    store: &dyn ScoreStore,
    out: &mut W,
) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Leaderboard { mode, limit, page } => {
            let mode = DurationMode::from_secs(*mode);
            let rows = store.query_top(mode, *limit)?;
            write!(
                out,
                "{}",
                format_table(mode, &paginate(&rows, *page, ENTRIES_PER_PAGE))
            )?;
        }
        Command::Profile { name } => match load_profile(store, name)? {
            Some(profile) => write!(out, "{}", format_profile(&profile))?,
            None => writeln!(out, "no user named {name}")?,
        },
        Command::Rename { email, new_name } => {
            let new_name = new_name.trim();
            if new_name.is_empty() {
                return Err("display name cannot be empty".into());
            }
            let user = User::try_from_email(email)?;
            match store.update_display_name(&user.uid, new_name)? {
                0 => writeln!(out, "no scores found for {email}")?,
                n => writeln!(out, "renamed {n} scores to {new_name}")?,
            }
        }
        Command::Seed => {
            let records = sample_records(Utc::now());
            for record in &records {
                store.append(record)?;
            }
            writeln!(out, "added {} sample scores", records.len())?;
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing();

    let db_path = cli.db.clone().unwrap_or_else(AppDirs::db_path);

    if let Some(command) = &cli.command {
        let store = SqliteScoreStore::open(&db_path)?;
        return run_command(command, &store, &mut io::stdout().lock());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let config_store = FileConfigStore::new();
    let config = cli.apply(config_store.load());

    let identity = match &config.email {
        Some(email) => LocalIdentity::signed_in(User::try_from_email(email)?),
        None => LocalIdentity::new(),
    };
    let store: Arc<dyn ScoreStore> = Arc::new(SqliteScoreStore::open(&db_path)?);
    let source: Box<dyn TextSource> = match &cli.prompt {
        Some(prompt) => Box::new(FixedText::new(prompt.clone())),
        None => Box::new(WordGenerator::new(
            Language::english()?,
            config.word_gen_config(),
        )),
    };
    let engine = SessionEngine::new(
        source,
        Box::new(StoreSubmitter::new(Arc::clone(&store))),
        Arc::new(identity),
    )
    .with_quality_floor(config.quality_floor());

    let guard = TerminalGuard::enter(io::stdout())?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;

    let runner = Runner::new(CrosstermEventSource::new(), Duration::from_millis(POLL_MS));
    let mut app = App::new(engine, store, config, runner.sender(), cli.prompt.is_some());
    let result = start_tui(&mut terminal, &mut app, &runner);

    drop(terminal);
    drop(guard);

    if let Err(e) = config_store.save(&app.config) {
        tracing::warn!(error = %e, "failed to save config");
    }

    result
}

/// Raw mode and the alternate screen, restored on drop so that errors and
/// panics leave a usable terminal behind.
struct TerminalGuard<W: Write> {
    out: W,
}

impl<W: Write> TerminalGuard<W> {
    fn enter(mut out: W) -> io::Result<Self> {
        enable_raw_mode()?;
        if let Err(e) = execute!(out, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        Ok(Self { out })
    }
}

impl<W: Write> Drop for TerminalGuard<W> {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.out, LeaveAlternateScreen, Show);
    }
}

fn start_tui<B: Backend, E: RaceEventSource>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E>,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| ui(app, f))?;

    loop {
        let Some(event) = runner.step() else {
            continue;
        };
        if app.on_event(event) == Flow::Quit {
            break;
        }
        terminal.draw(|f| ui(app, f))?;
    }

    Ok(())
}

fn ui(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}

#[cfg(test)]
impl App {
    pub(crate) fn for_test(prompt: &str, email: Option<&str>) -> Self {
        let store: Arc<dyn ScoreStore> =
            Arc::new(SqliteScoreStore::open_in_memory().expect("in-memory store"));
        let identity = match email {
            Some(email) => LocalIdentity::signed_in(User::from_email(email)),
            None => LocalIdentity::new(),
        };
        let engine = SessionEngine::new(
            Box::new(FixedText::new(prompt)),
            Box::new(StoreSubmitter::new(Arc::clone(&store))),
            Arc::new(identity),
        );
        let (tx, _rx) = std::sync::mpsc::channel();
        App::new(engine, store, Config::default(), tx, true)
    }
}
