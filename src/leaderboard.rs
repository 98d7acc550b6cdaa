use itertools::Itertools;

use crate::error::StoreError;
use crate::record::ResultRecord;
use crate::session::DurationMode;
use crate::store::ScoreStore;

pub const ENTRIES_PER_PAGE: usize = 10;
/// Rows fetched for one leaderboard view
pub const LEADERBOARD_LIMIT: usize = 100;

/// One page of a longer list, pages numbered from 1
#[derive(Debug, Clone, PartialEq)]
pub struct Page<'a, T> {
    pub number: usize,
    pub total_pages: usize,
    pub items: &'a [T],
    /// Position of `items[0]` in the full list, 0-based
    pub offset: usize,
}

/// Slice out page `number`, clamped into range
pub fn paginate<T>(items: &[T], number: usize, per_page: usize) -> Page<'_, T> {
    let per_page = per_page.max(1);
    let total_pages = items.len().div_ceil(per_page).max(1);
    let number = number.clamp(1, total_pages);
    let offset = (number - 1) * per_page;
    let end = (offset + per_page).min(items.len());

    Page {
        number,
        total_pages,
        items: &items[offset.min(end)..end],
        offset,
    }
}

/// Best record for each mode, ordered by mode
pub fn best_by_mode(records: &[ResultRecord]) -> Vec<ResultRecord> {
    records
        .iter()
        .into_group_map_by(|r| r.mode)
        .into_iter()
        .sorted_by_key(|(mode, _)| *mode)
        .filter_map(|(_, rs)| {
            rs.into_iter()
                .max_by(|a, b| a.score.cmp(&b.score).then(a.created_at.cmp(&b.created_at)))
                .cloned()
        })
        .collect()
}

/// Best result and standing for one mode
#[derive(Debug, Clone, PartialEq)]
pub struct ModeStanding {
    pub best: ResultRecord,
    pub rank: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub user_id: String,
    pub display_name: String,
    pub tests_taken: usize,
    pub standings: Vec<ModeStanding>,
}

/// Look a user up by display name and gather their results
pub fn load_profile(store: &dyn ScoreStore, name: &str) -> Result<Option<Profile>, StoreError> {
    let Some(user) = store.find_user_by_display_name(name)? else {
        return Ok(None);
    };
    let records = store.query_by_user(&user.user_id)?;

    let mut standings = Vec::new();
    for best in best_by_mode(&records) {
        let rank = store.rank(&user.user_id, best.mode)?;
        standings.push(ModeStanding { best, rank });
    }

    Ok(Some(Profile {
        user_id: user.user_id,
        display_name: user.display_name,
        tests_taken: records.len(),
        standings,
    }))
}

/// Leaderboard rows as plain text for the CLI
pub fn format_table(mode: DurationMode, page: &Page<'_, ResultRecord>) -> String {
    let mut out = format!(
        "time {} leaderboard (page {}/{})\n",
        mode.secs(),
        page.number,
        page.total_pages
    );
    if page.items.is_empty() {
        out.push_str("no scores yet\n");
        return out;
    }

    out.push_str(&format!(
        "{:>4}  {:<20} {:>5} {:>5} {:>6}  {}\n",
        "#", "name", "wpm", "acc", "score", "date"
    ));
    for (i, r) in page.items.iter().enumerate() {
        out.push_str(&format!(
            "{:>4}  {:<20} {:>5} {:>4}% {:>6}  {}\n",
            page.offset + i + 1,
            r.display_name,
            r.wpm,
            r.accuracy,
            r.score,
            r.created_at.format("%Y-%m-%d %H:%M"),
        ));
    }
    out
}

pub fn format_profile(profile: &Profile) -> String {
    let mut out = format!(
        "{}\ntests taken: {}\n",
        profile.display_name, profile.tests_taken
    );
    for standing in &profile.standings {
        let best = &standing.best;
        let rank = standing
            .rank
            .map_or_else(|| "-".to_string(), |r| format!("#{r}"));
        out.push_str(&format!(
            "{:>4}  best {} wpm  {}% acc  score {}  rank {}\n",
            best.mode.to_string(),
            best.wpm,
            best.accuracy,
            best.score,
            rank
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteScoreStore;
    use chrono::{Duration, Utc};

    fn record(user: &str, name: &str, score: u32, mode: DurationMode) -> ResultRecord {
        ResultRecord {
            id: None,
            user_id: user.into(),
            display_name: name.into(),
            wpm: score,
            accuracy: 100,
            mode,
            score,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn paginate_splits_pages() {
        let items: Vec<u32> = (1..=25).collect();

        let first = paginate(&items, 1, 10);
        assert_eq!(first.items, &items[0..10]);
        assert_eq!(first.total_pages, 3);

        let last = paginate(&items, 3, 10);
        assert_eq!(last.items, &[21, 22, 23, 24, 25]);
        assert_eq!(last.offset, 20);
    }

    #[test]
    fn paginate_clamps() {
        let items: Vec<u32> = (1..=5).collect();
        assert_eq!(paginate(&items, 0, 10).number, 1);
        assert_eq!(paginate(&items, 9, 10).number, 1);

        let empty: Vec<u32> = Vec::new();
        let page = paginate(&empty, 2, 10);
        assert_eq!(page.total_pages, 1);
        assert!(page.items.is_empty());
    }

    #[test]
    fn best_by_mode_picks_highest_score() {
        let t0 = Utc::now();
        let mut a = record("u", "u", 40, DurationMode::THIRTY);
        a.created_at = t0;
        let b = record("u", "u", 70, DurationMode::THIRTY);
        let c = record("u", "u", 55, DurationMode::SIXTY);
        let mut d = record("u", "u", 40, DurationMode::SIXTY);
        d.created_at = t0 - Duration::days(1);

        let best = best_by_mode(&[a, b, c, d]);
        assert_eq!(best.len(), 2);
        assert_eq!((best[0].mode, best[0].score), (DurationMode::THIRTY, 70));
        assert_eq!((best[1].mode, best[1].score), (DurationMode::SIXTY, 55));
    }

    #[test]
    fn profile_collects_standings() {
        let store = SqliteScoreStore::open_in_memory().unwrap();
        store
            .append(&record("u1", "Ada", 50, DurationMode::THIRTY))
            .unwrap();
        store
            .append(&record("u1", "Ada", 65, DurationMode::THIRTY))
            .unwrap();
        store
            .append(&record("u1", "Ada", 44, DurationMode::SIXTY))
            .unwrap();
        store
            .append(&record("u2", "Bob", 90, DurationMode::THIRTY))
            .unwrap();

        let profile = load_profile(&store, "ada").unwrap().unwrap();
        assert_eq!(profile.display_name, "Ada");
        assert_eq!(profile.tests_taken, 3);
        assert_eq!(profile.standings.len(), 2);
        assert_eq!(profile.standings[0].best.score, 65);
        assert_eq!(profile.standings[0].rank, Some(2));
        assert_eq!(profile.standings[1].rank, Some(1));

        let text = format_profile(&profile);
        assert!(text.starts_with("Ada\ntests taken: 3\n"));
        assert!(text.contains(" 30s  best 65 wpm  100% acc  score 65  rank #2"));
        assert!(text.contains(" 60s  best 44 wpm"));

        assert!(load_profile(&store, "nobody").unwrap().is_none());
    }

    #[test]
    fn table_lists_ranks_from_offset() {
        let rows: Vec<ResultRecord> = (0..12)
            .map(|i| record(&format!("u{i}"), &format!("user{i}"), 100 - i, DurationMode::THIRTY))
            .collect();
        let page = paginate(&rows, 2, ENTRIES_PER_PAGE);
        let text = format_table(DurationMode::THIRTY, &page);

        assert!(text.starts_with("time 30 leaderboard (page 2/2)"));
        assert!(text.contains("  11  user10"));
        assert!(text.contains("  12  user11"));
    }

    #[test]
    fn empty_table() {
        let rows: Vec<ResultRecord> = Vec::new();
        let text = format_table(DurationMode::SIXTY, &paginate(&rows, 1, ENTRIES_PER_PAGE));
        assert!(text.contains("no scores yet"));
    }
}
