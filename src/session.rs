use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Length of a timed test in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DurationMode(u32);

impl DurationMode {
    pub const THIRTY: DurationMode = DurationMode(30);
    pub const SIXTY: DurationMode = DurationMode(60);

    /// Zero-length tests make no sense; they are bumped to one second.
    pub fn from_secs(secs: u32) -> Self {
        Self(secs.max(1))
    }

    pub fn secs(&self) -> u32 {
        self.0
    }

    /// The other leaderboard mode, used to flip between the two boards
    pub fn toggled(&self) -> Self {
        if *self == Self::THIRTY {
            Self::SIXTY
        } else {
            Self::THIRTY
        }
    }
}

impl Default for DurationMode {
    fn default() -> Self {
        Self::THIRTY
    }
}

impl fmt::Display for DurationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Status {
    Idle,
    Running,
    Complete,
}

/// One timed typing attempt
#[derive(Debug, Clone)]
pub struct Session {
    pub target: Vec<char>,
    pub typed: Vec<char>,
    pub mode: DurationMode,
    pub seconds_remaining: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: Status,
}

impl Session {
    pub fn new(target: &str, mode: DurationMode) -> Self {
        Self {
            target: target.chars().collect(),
            typed: Vec::new(),
            mode,
            seconds_remaining: mode.secs(),
            started_at: None,
            ended_at: None,
            status: Status::Idle,
        }
    }

    pub fn target_text(&self) -> String {
        self.target.iter().collect()
    }

    pub fn typed_text(&self) -> String {
        self.typed.iter().collect()
    }

    /// Index of the word the cursor is in (words are separated by single spaces)
    pub fn current_word_index(&self) -> usize {
        self.typed.iter().filter(|c| **c == ' ').count()
    }

    /// Characters typed since the last space
    pub fn current_word_len(&self) -> usize {
        self.typed.iter().rev().take_while(|c| **c != ' ').count()
    }

    pub fn target_word_len(&self, word_idx: usize) -> usize {
        self.target
            .split(|c| *c == ' ')
            .nth(word_idx)
            .map_or(0, <[char]>::len)
    }

    pub fn target_word_count(&self) -> usize {
        self.target
            .split(|c| *c == ' ')
            .filter(|w| !w.is_empty())
            .count()
    }

    /// Words that still lie ahead of the cursor, including the one being typed
    pub fn untyped_word_count(&self) -> usize {
        self.target_word_count()
            .saturating_sub(self.current_word_index())
    }

    /// True once the trimmed input equals the whole trimmed target
    pub fn is_text_finished(&self) -> bool {
        let typed = self.typed_text();
        let typed = typed.trim();
        !typed.is_empty() && typed == self.target_text().trim()
    }

    pub fn has_started(&self) -> bool {
        self.status != Status::Idle
    }

    pub fn has_finished(&self) -> bool {
        self.status == Status::Complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_new() {
        let session = Session::new("hello world", DurationMode::THIRTY);

        assert_eq!(session.target_text(), "hello world");
        assert!(session.typed.is_empty());
        assert_eq!(session.seconds_remaining, 30);
        assert_eq!(session.status, Status::Idle);
        assert!(session.started_at.is_none());
        assert!(!session.has_started());
        assert!(!session.has_finished());
    }

    #[test]
    fn test_duration_mode() {
        assert_eq!(DurationMode::from_secs(0).secs(), 1);
        assert_eq!(DurationMode::from_secs(60), DurationMode::SIXTY);
        assert_eq!(DurationMode::THIRTY.toggled(), DurationMode::SIXTY);
        assert_eq!(DurationMode::SIXTY.toggled(), DurationMode::THIRTY);
        assert_eq!(DurationMode::from_secs(45).toggled(), DurationMode::THIRTY);
        assert_eq!(DurationMode::SIXTY.to_string(), "60s");
    }

    #[test]
    fn test_word_tracking() {
        let mut session = Session::new("the quick brown", DurationMode::THIRTY);
        session.typed = "the qu".chars().collect();

        assert_eq!(session.current_word_index(), 1);
        assert_eq!(session.current_word_len(), 2);
        assert_eq!(session.target_word_len(1), 5);
        assert_eq!(session.target_word_len(7), 0);
        assert_eq!(session.target_word_count(), 3);
        assert_eq!(session.untyped_word_count(), 2);
    }

    #[test]
    fn test_is_text_finished() {
        let mut session = Session::new("hi there", DurationMode::THIRTY);
        assert!(!session.is_text_finished());

        session.typed = "hi ther".chars().collect();
        assert!(!session.is_text_finished());

        session.typed = "hi there".chars().collect();
        assert!(session.is_text_finished());

        session.typed = "hi thera".chars().collect();
        assert!(!session.is_text_finished());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(Status::Running.to_string(), "Running");
    }
}
