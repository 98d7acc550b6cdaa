use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::User;
use crate::metrics::LiveMetrics;
use crate::session::DurationMode;

pub type RecordId = i64;

/// Final result of a completed session.
///
/// `id` is only present on records read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub id: Option<RecordId>,
    pub user_id: String,
    pub display_name: String,
    pub wpm: u32,
    pub accuracy: u32,
    pub mode: DurationMode,
    pub score: u32,
    pub created_at: DateTime<Utc>,
}

impl ResultRecord {
    pub fn new(
        user: &User,
        metrics: LiveMetrics,
        mode: DurationMode,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            user_id: user.uid.clone(),
            display_name: user.default_display_name(),
            wpm: metrics.wpm,
            accuracy: metrics.accuracy,
            mode,
            score: metrics.score,
            created_at,
        }
    }
}

/// Minimum result worth putting on the leaderboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityFloor {
    pub min_wpm: u32,
    pub min_accuracy: u32,
}

impl Default for QualityFloor {
    fn default() -> Self {
        Self {
            min_wpm: 10,
            min_accuracy: 80,
        }
    }
}

impl QualityFloor {
    pub fn accepts(&self, metrics: &LiveMetrics) -> bool {
        metrics.wpm >= self.min_wpm && metrics.accuracy >= self.min_accuracy
    }
}

/// Demo scores for an empty leaderboard
pub fn sample_records(now: DateTime<Utc>) -> Vec<ResultRecord> {
    [
        ("sample1", "Speed Demon", 120, 98, DurationMode::THIRTY, 118),
        ("sample2", "Typing Master", 115, 97, DurationMode::THIRTY, 112),
        ("sample3", "Keyboard Warrior", 110, 96, DurationMode::SIXTY, 105),
        ("sample4", "Fast Fingers", 105, 95, DurationMode::SIXTY, 100),
        ("sample5", "Quick Typist", 100, 94, DurationMode::THIRTY, 94),
    ]
    .into_iter()
    .map(|(uid, name, wpm, accuracy, mode, score)| ResultRecord {
        id: None,
        user_id: uid.to_string(),
        display_name: name.to_string(),
        wpm,
        accuracy,
        mode,
        score,
        created_at: now,
    })
    .collect()
}
