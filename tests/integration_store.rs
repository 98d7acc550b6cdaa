use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use tempfile::tempdir;

use keyrace::engine::{SessionEngine, Submission};
use keyrace::identity::{LocalIdentity, User};
use keyrace::leaderboard::load_profile;
use keyrace::record::ResultRecord;
use keyrace::runtime::ManualClock;
use keyrace::session::DurationMode;
use keyrace::store::{ScoreStore, SqliteScoreStore};
use keyrace::submit::StoreSubmitter;
use keyrace::text_supply::FixedText;
use keyrace::typing_policy::Keystroke;

fn wait_for_rows(store: &dyn ScoreStore, mode: DurationMode, n: usize) -> Vec<ResultRecord> {
    for _ in 0..200 {
        let rows = store.query_top(mode, 100).unwrap();
        if rows.len() >= n {
            return rows;
        }
        thread::sleep(Duration::from_millis(10));
    }
    store.query_top(mode, 100).unwrap()
}

fn play(store: Arc<dyn ScoreStore>, email: &str, text: &str, typed: &str, secs: i64) -> Submission {
    let clock = ManualClock::new(Utc::now());
    let mut engine = SessionEngine::new(
        Box::new(FixedText::new(text)),
        Box::new(StoreSubmitter::new(store)),
        Arc::new(LocalIdentity::signed_in(User::from_email(email))),
    )
    .with_clock(Box::new(clock.clone()));
    engine.restart(DurationMode::THIRTY);

    let mut chars = typed.chars();
    if let Some(first) = chars.next() {
        engine.on_keystroke(Keystroke::Char(first));
    }
    clock.advance(chrono::Duration::seconds(secs));
    for c in chars {
        engine.on_keystroke(Keystroke::Char(c));
    }
    assert!(engine.has_finished());
    engine.submission()
}

#[test]
fn completed_sessions_reach_the_leaderboard() {
    let dir = tempdir().unwrap();
    let store: Arc<dyn ScoreStore> =
        Arc::new(SqliteScoreStore::open(dir.path().join("db").join("scores.db")).unwrap());

    // 10 chars in 6 seconds: 20 wpm
    let text = "quick fox!";
    assert_eq!(
        play(store.clone(), "ada@example.com", text, text, 6),
        Submission::Submitted
    );
    // 10 chars in 3 seconds: 40 wpm
    assert_eq!(
        play(store.clone(), "bob@example.com", text, text, 3),
        Submission::Submitted
    );

    let rows = wait_for_rows(store.as_ref(), DurationMode::THIRTY, 2);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].display_name, "bob");
    assert_eq!(rows[0].wpm, 40);
    assert_eq!(rows[1].display_name, "ada");
    assert_eq!(rows[1].score, 20);
}

#[test]
fn slow_sessions_stay_off_the_leaderboard() {
    let store: Arc<dyn ScoreStore> = Arc::new(SqliteScoreStore::open_in_memory().unwrap());

    // 2 chars in 6 seconds: 4 wpm
    assert_eq!(
        play(store.clone(), "ada@example.com", "hi", "hi", 6),
        Submission::BelowFloor
    );
    thread::sleep(Duration::from_millis(50));
    assert!(store.query_top(DurationMode::THIRTY, 10).unwrap().is_empty());
}

#[test]
fn renamed_users_keep_their_name_and_rank() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("scores.db");
    let store: Arc<dyn ScoreStore> = Arc::new(SqliteScoreStore::open(&path).unwrap());
    let text = "quick fox!";

    play(store.clone(), "ada@example.com", text, text, 6);
    wait_for_rows(store.as_ref(), DurationMode::THIRTY, 1);
    store
        .update_display_name(&User::from_email("ada@example.com").uid, "Countess")
        .unwrap();

    play(store.clone(), "ada@example.com", text, text, 3);
    play(store.clone(), "bob@example.com", text, text, 4);
    let uid = User::from_email("ada@example.com").uid;
    for _ in 0..200 {
        if store.query_by_user(&uid).unwrap().len() == 2 {
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }
    wait_for_rows(store.as_ref(), DurationMode::THIRTY, 2);

    // reopen to prove the data is on disk
    let reopened = SqliteScoreStore::open(&path).unwrap();
    let profile = load_profile(&reopened, "COUNTESS").unwrap().unwrap();
    assert_eq!(profile.tests_taken, 2);
    assert_eq!(profile.standings.len(), 1);
    assert_eq!(profile.standings[0].best.wpm, 40);
    assert_eq!(profile.standings[0].best.display_name, "Countess");
    assert_eq!(profile.standings[0].rank, Some(1));
}
