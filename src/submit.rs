use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::error::StoreError;
use crate::record::{RecordId, ResultRecord};
use crate::store::ScoreStore;

/// Receives the result of a completed session
pub trait ResultSink {
    fn submit(&self, record: ResultRecord);
}

/// Saves results to a score store on a detached thread.
///
/// The engine never waits on the outcome; failures are logged and dropped.
#[derive(Clone)]
pub struct StoreSubmitter {
    store: Arc<dyn ScoreStore>,
}

impl StoreSubmitter {
    pub fn new(store: Arc<dyn ScoreStore>) -> Self {
        Self { store }
    }

    /// Spawn the save and hand back its handle (tests join on it)
    pub fn spawn(&self, record: ResultRecord) -> JoinHandle<Result<RecordId, StoreError>> {
        let store = Arc::clone(&self.store);
        thread::spawn(move || {
            let result = save(store.as_ref(), record);
            match &result {
                Ok(id) => tracing::info!(id, "score saved"),
                Err(e) => tracing::warn!(error = %e, "failed to save score"),
            }
            result
        })
    }
}

/// A renamed user keeps their latest name on new records
fn save(store: &dyn ScoreStore, mut record: ResultRecord) -> Result<RecordId, StoreError> {
    if let Some(name) = store.latest_display_name(&record.user_id)? {
        record.display_name = name;
    }
    store.append(&record)
}

impl ResultSink for StoreSubmitter {
    fn submit(&self, record: ResultRecord) {
        drop(self.spawn(record));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::DurationMode;
    use crate::store::{KnownUser, SqliteScoreStore};
    use chrono::Utc;

    fn record(user: &str, name: &str) -> ResultRecord {
        ResultRecord {
            id: None,
            user_id: user.to_string(),
            display_name: name.to_string(),
            wpm: 60,
            accuracy: 97,
            mode: DurationMode::THIRTY,
            score: 58,
            created_at: Utc::now(),
        }
    }

    struct BrokenStore;

    impl ScoreStore for BrokenStore {
        fn append(&self, _record: &ResultRecord) -> Result<RecordId, StoreError> {
            Err(StoreError::Poisoned)
        }
        fn query_top(&self, _: DurationMode, _: usize) -> Result<Vec<ResultRecord>, StoreError> {
            Err(StoreError::Poisoned)
        }
        fn query_by_user(&self, _: &str) -> Result<Vec<ResultRecord>, StoreError> {
            Err(StoreError::Poisoned)
        }
        fn update_display_name(&self, _: &str, _: &str) -> Result<usize, StoreError> {
            Err(StoreError::Poisoned)
        }
        fn latest_display_name(&self, _: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }
        fn find_user_by_display_name(&self, _: &str) -> Result<Option<KnownUser>, StoreError> {
            Ok(None)
        }
    }

    #[test]
    fn saves_to_store() {
        let store = Arc::new(SqliteScoreStore::open_in_memory().unwrap());
        let submitter = StoreSubmitter::new(store.clone());

        let id = submitter.spawn(record("u1", "ada")).join().unwrap().unwrap();
        let rows = store.query_by_user("u1").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, Some(id));
    }

    #[test]
    fn keeps_renamed_display_name() {
        let store = Arc::new(SqliteScoreStore::open_in_memory().unwrap());
        let submitter = StoreSubmitter::new(store.clone());

        submitter.spawn(record("u1", "ada")).join().unwrap().unwrap();
        store.update_display_name("u1", "Countess").unwrap();
        submitter.spawn(record("u1", "ada")).join().unwrap().unwrap();

        let rows = store.query_by_user("u1").unwrap();
        assert!(rows.iter().all(|r| r.display_name == "Countess"));
    }

    #[test]
    fn failure_is_reported_not_raised() {
        let submitter = StoreSubmitter::new(Arc::new(BrokenStore));
        let outcome = submitter.spawn(record("u1", "ada")).join().unwrap();
        assert!(outcome.is_err());

        // fire-and-forget path must not panic either
        submitter.submit(record("u1", "ada"));
    }
}
