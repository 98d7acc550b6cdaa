use std::ops::Range;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Widget},
};
use unicode_width::UnicodeWidthChar;

use keyrace::{
    engine::Submission,
    leaderboard::{paginate, ENTRIES_PER_PAGE},
    session::Session,
};

use crate::{App, AppState};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;
/// Lines of target text on screen while typing
const VISIBLE_LINES: usize = 3;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state {
            AppState::Typing => render_typing(self, area, buf),
            AppState::Results => render_results(self, area, buf),
            AppState::Leaderboard => render_leaderboard(self, area, buf),
        }
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim_bold() -> Style {
    bold().add_modifier(Modifier::DIM)
}

fn legend(text: &str) -> Paragraph<'_> {
    Paragraph::new(Span::styled(
        text,
        Style::default().add_modifier(Modifier::ITALIC),
    ))
}

/// Greedy word wrap into char ranges at most `width` columns wide.
/// A trailing space may overhang the edge.
fn wrap_lines(text: &[char], width: usize) -> Vec<Range<usize>> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut start = 0;
    let mut used = 0;
    let mut break_at: Option<usize> = None;

    for (i, c) in text.iter().enumerate() {
        let w = c.width().unwrap_or(0);
        if *c != ' ' && used + w > width && i > start {
            let end = break_at.filter(|b| *b > start).unwrap_or(i);
            lines.push(start..end);
            used = text[end..i].iter().map(|c| c.width().unwrap_or(0)).sum();
            start = end;
            break_at = None;
        }
        used += w;
        if *c == ' ' {
            break_at = Some(i + 1);
        }
    }
    if start < text.len() || lines.is_empty() {
        lines.push(start..text.len());
    }
    lines
}

fn styled_char(session: &Session, idx: usize) -> Span<'static> {
    let expected = session.target[idx];
    match session.typed.get(idx) {
        Some(typed) if *typed == expected => {
            Span::styled(expected.to_string(), bold().fg(Color::Green))
        }
        Some(typed) => Span::styled(
            match typed {
                ' ' => "·".to_owned(),
                c => c.to_string(),
            },
            bold().fg(Color::Red),
        ),
        None if idx == session.typed.len() => Span::styled(
            expected.to_string(),
            dim_bold().add_modifier(Modifier::UNDERLINED),
        ),
        None => Span::styled(expected.to_string(), dim_bold()),
    }
}

/// Lines around the cursor, one line of context above it
fn visible_text(session: &Session, width: usize) -> Vec<Line<'static>> {
    let lines = wrap_lines(&session.target, width);
    let cursor = session.typed.len();
    let cursor_line = lines
        .iter()
        .position(|r| r.contains(&cursor))
        .unwrap_or(lines.len().saturating_sub(1));

    lines
        .into_iter()
        .skip(cursor_line.saturating_sub(1))
        .take(VISIBLE_LINES)
        .map(|range| Line::from(range.map(|i| styled_char(session, i)).collect::<Vec<_>>()))
        .collect()
}

fn render_typing(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(VISIBLE_LINES as u16),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    let engine = &app.engine;
    let status = if engine.is_running() {
        let m = engine.metrics();
        format!(
            "{}   {} wpm   {}% acc",
            engine.seconds_remaining(),
            m.wpm,
            m.accuracy
        )
    } else {
        format!("{}   start typing", engine.seconds_remaining())
    };
    Paragraph::new(Span::styled(status, dim_bold()))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    let width = chunks[3].width as usize;
    Paragraph::new(visible_text(engine.session(), width)).render(chunks[3], buf);

    legend("(tab) new text / (esc)ape").render(chunks[5], buf);
}

pub fn submission_message(app: &App) -> String {
    match app.engine.submission() {
        Submission::Submitted => "saved to the leaderboard".to_string(),
        Submission::BelowFloor => {
            let floor = app.config.quality_floor();
            format!(
                "not saved: needs {} wpm and {}% accuracy",
                floor.min_wpm, floor.min_accuracy
            )
        }
        Submission::SignedOut => "not saved: pass --email to record scores".to_string(),
        Submission::Pending => String::new(),
    }
}

fn render_results(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(1), // stats
            Constraint::Length(1), // mode
            Constraint::Length(1),
            Constraint::Length(1), // save status
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ])
        .split(area);

    let m = app.engine.metrics();
    Paragraph::new(Span::styled(
        format!("{} wpm   {}% acc   {} score", m.wpm, m.accuracy, m.score),
        bold(),
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    Paragraph::new(Span::styled(format!("time {}", app.engine.mode()), dim_bold()))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    let saved_style = match app.engine.submission() {
        Submission::Submitted => Style::default().fg(Color::Green),
        _ => Style::default().fg(Color::Yellow),
    };
    Paragraph::new(Span::styled(submission_message(app), saved_style))
        .alignment(Alignment::Center)
        .render(chunks[4], buf);

    legend("(r)etry / (n)ew / (l)eaderboard / (esc)ape").render(chunks[6], buf);
}

fn render_leaderboard(app: &App, area: Rect, buf: &mut Buffer) {
    let view = &app.leaderboard;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    let page = paginate(&view.rows, view.page, ENTRIES_PER_PAGE);
    let title = format!(
        " time {} leaderboard | page {}/{} ",
        view.mode, page.number, page.total_pages
    );
    let block = Block::default().borders(Borders::ALL).title(title);

    if let Some(error) = &view.error {
        Paragraph::new(Span::styled(
            format!("could not load scores: {error}"),
            Style::default().fg(Color::Red),
        ))
        .block(block)
        .render(chunks[0], buf);
    } else if page.items.is_empty() {
        Paragraph::new("no scores yet")
            .alignment(Alignment::Center)
            .block(block)
            .render(chunks[0], buf);
    } else {
        let header = Row::new(["#", "name", "wpm", "acc", "score", "date"])
            .style(bold().fg(Color::Yellow));
        let rows = page.items.iter().enumerate().map(|(i, r)| {
            Row::new(vec![
                Cell::from((page.offset + i + 1).to_string()),
                Cell::from(r.display_name.clone()),
                Cell::from(r.wpm.to_string()),
                Cell::from(format!("{}%", r.accuracy)),
                Cell::from(r.score.to_string()).style(bold()),
                Cell::from(r.created_at.format("%Y-%m-%d").to_string()),
            ])
        });
        let widths = [
            Constraint::Length(4),
            Constraint::Min(12),
            Constraint::Length(5),
            Constraint::Length(5),
            Constraint::Length(6),
            Constraint::Length(10),
        ];
        Table::new(rows, widths)
            .header(header)
            .block(block)
            .render(chunks[0], buf);
    }

    legend("(m)ode / (←/→) page / (r)efresh / (b)ack / (esc)ape").render(chunks[1], buf);
}
