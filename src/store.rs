use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::StoreError;
use crate::record::{RecordId, ResultRecord};
use crate::session::DurationMode;

/// A user found through their display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownUser {
    pub user_id: String,
    pub display_name: String,
}

/// Score store collaborator.
///
/// The engine only ever appends; the queries serve the leaderboard and
/// profile views.
pub trait ScoreStore: Send + Sync {
    fn append(&self, record: &ResultRecord) -> Result<RecordId, StoreError>;

    /// Best record per user for `mode`, by score then recency, both descending
    fn query_top(&self, mode: DurationMode, limit: usize) -> Result<Vec<ResultRecord>, StoreError>;

    /// Every record of a user, oldest first
    fn query_by_user(&self, user_id: &str) -> Result<Vec<ResultRecord>, StoreError>;

    /// Rewrites the display name on all of a user's records
    fn update_display_name(&self, user_id: &str, new_name: &str) -> Result<usize, StoreError>;

    /// Display name on the user's most recent record
    fn latest_display_name(&self, user_id: &str) -> Result<Option<String>, StoreError>;

    /// Case-insensitive lookup by display name
    fn find_user_by_display_name(&self, name: &str) -> Result<Option<KnownUser>, StoreError>;

    /// 1-based position of the user on the `mode` leaderboard
    fn rank(&self, user_id: &str, mode: DurationMode) -> Result<Option<usize>, StoreError> {
        let board = self.query_top(mode, usize::MAX)?;
        Ok(board
            .iter()
            .position(|r| r.user_id == user_id)
            .map(|i| i + 1))
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, user_id, display_name, wpm, accuracy, mode, score, created_at FROM scores";

/// SQLite-backed score store
#[derive(Debug)]
pub struct SqliteScoreStore {
    conn: Mutex<Connection>,
}

impl SqliteScoreStore {
    /// Open (or create) the database at `path` and create tables if needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS scores (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                display_name TEXT NOT NULL,
                wpm INTEGER NOT NULL,
                accuracy INTEGER NOT NULL,
                mode INTEGER NOT NULL,
                score INTEGER NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_scores_mode_score ON scores(mode, score DESC, created_at DESC)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_scores_user ON scores(user_id, created_at)",
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn collect(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<ResultRecord>, StoreError> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, record_from_row)?;

        let mut records = Vec::new();
        for record in rows {
            records.push(record?);
        }
        Ok(records)
    }
}

/// Fixed-width UTC timestamps so text ordering matches time ordering
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<ResultRecord> {
    let created_at: String = row.get(7)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?
        .with_timezone(&Utc);

    Ok(ResultRecord {
        id: Some(row.get(0)?),
        user_id: row.get(1)?,
        display_name: row.get(2)?,
        wpm: row.get(3)?,
        accuracy: row.get(4)?,
        mode: DurationMode::from_secs(row.get(5)?),
        score: row.get(6)?,
        created_at,
    })
}

impl ScoreStore for SqliteScoreStore {
    fn append(&self, record: &ResultRecord) -> Result<RecordId, StoreError> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO scores (user_id, display_name, wpm, accuracy, mode, score, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                record.user_id,
                record.display_name,
                record.wpm,
                record.accuracy,
                record.mode.secs(),
                record.score,
                format_timestamp(&record.created_at),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn query_top(&self, mode: DurationMode, limit: usize) -> Result<Vec<ResultRecord>, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            r#"
            {SELECT_COLUMNS} AS s
            WHERE s.mode = ?1
              AND s.id = (
                SELECT t.id FROM scores AS t
                WHERE t.user_id = s.user_id AND t.mode = s.mode
                ORDER BY t.score DESC, t.created_at DESC, t.id DESC
                LIMIT 1
              )
            ORDER BY s.score DESC, s.created_at DESC, s.id DESC
            LIMIT ?2
            "#
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        Self::collect(&conn, &sql, params![mode.secs(), limit])
    }

    fn query_by_user(&self, user_id: &str) -> Result<Vec<ResultRecord>, StoreError> {
        let conn = self.conn()?;
        let sql = format!("{SELECT_COLUMNS} WHERE user_id = ?1 ORDER BY created_at ASC, id ASC");
        Self::collect(&conn, &sql, params![user_id])
    }

    fn update_display_name(&self, user_id: &str, new_name: &str) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE scores SET display_name = ?2 WHERE user_id = ?1",
            params![user_id, new_name],
        )?;
        Ok(changed)
    }

    fn latest_display_name(&self, user_id: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn()?;
        let name = conn
            .query_row(
                "SELECT display_name FROM scores WHERE user_id = ?1 ORDER BY created_at DESC, id DESC LIMIT 1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(name)
    }

    fn find_user_by_display_name(&self, name: &str) -> Result<Option<KnownUser>, StoreError> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                r#"
                SELECT user_id, display_name FROM scores
                WHERE lower(display_name) = lower(?1)
                ORDER BY created_at DESC, id DESC
                LIMIT 1
                "#,
                params![name.trim()],
                |row| {
                    Ok(KnownUser {
                        user_id: row.get(0)?,
                        display_name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }
}
