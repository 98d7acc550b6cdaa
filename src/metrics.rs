use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Standard word length used for wpm
pub const CHARS_PER_WORD: f64 = 5.0;

/// Metrics recomputed on every keystroke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveMetrics {
    pub wpm: u32,
    pub accuracy: u32,
    pub score: u32,
}

impl Default for LiveMetrics {
    fn default() -> Self {
        Self {
            wpm: 0,
            accuracy: 100,
            score: 0,
        }
    }
}

/// Number of typed positions that match the target at the same index.
/// Positions past the end of the target count as wrong.
pub fn count_correct(target: &[char], typed: &[char]) -> usize {
    typed
        .iter()
        .enumerate()
        .filter(|(i, c)| target.get(*i) == Some(*c))
        .count()
}

pub fn accuracy_percent(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 100;
    }
    ((correct as f64 / total as f64) * 100.0).round() as u32
}

pub fn words_per_minute(typed_chars: usize, elapsed_minutes: f64) -> u32 {
    if elapsed_minutes <= 0.0 {
        return 0;
    }
    ((typed_chars as f64 / CHARS_PER_WORD) / elapsed_minutes).round() as u32
}

pub fn score(wpm: u32, accuracy: u32) -> u32 {
    (wpm as f64 * (accuracy as f64 / 100.0)).round() as u32
}

/// Minutes elapsed for wpm purposes.
///
/// Uses wall-clock time since `started_at`. When no wall-clock time has
/// passed yet it falls back to the whole seconds consumed from the budget.
pub fn elapsed_minutes(
    started_at: Option<DateTime<Utc>>,
    until: DateTime<Utc>,
    mode_secs: u32,
    remaining_secs: u32,
) -> f64 {
    if let Some(start) = started_at {
        let ms = (until - start).num_milliseconds();
        if ms > 0 {
            return ms as f64 / 1000.0 / 60.0;
        }
    }
    mode_secs.saturating_sub(remaining_secs) as f64 / 60.0
}

pub fn compute_metrics(target: &[char], typed: &[char], elapsed_minutes: f64) -> LiveMetrics {
    let correct = count_correct(target, typed);
    let accuracy = accuracy_percent(correct, typed.len());
    let wpm = words_per_minute(typed.len(), elapsed_minutes);

    LiveMetrics {
        wpm,
        accuracy,
        score: score(wpm, accuracy),
    }
}
