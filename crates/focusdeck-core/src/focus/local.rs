use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::sink::{write_failure, FocusSink};
use crate::error::{CoreError, Result};
use crate::storage::Database;

/// Credits focus time to the `tasks` table of the local SQLite database.
///
/// Queries run on tokio's blocking pool so a slow disk never stalls the
/// countdown task.
pub struct LocalFocusSink {
    db: Arc<Mutex<Database>>,
}

impl LocalFocusSink {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    async fn with_db<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let db = db.lock().unwrap_or_else(|e| e.into_inner());
            f(&db)
        })
        .await
        .map_err(|e| CoreError::Io(std::io::Error::other(e)))?
    }
}

#[async_trait]
impl FocusSink for LocalFocusSink {
    fn name(&self) -> &str {
        "local"
    }

    async fn increment_focus_time(&self, task_id: &str, seconds: u64) -> Result<()> {
        let id = task_id.to_string();
        self.with_db(move |db| db.increment_focus_time(&id, seconds))
            .await
            .map(|_| ())
            .map_err(|e| write_failure(self.name(), task_id, seconds, e))
    }

    async fn update_focus_time(&self, task_id: &str, new_total: u64) -> Result<()> {
        let id = task_id.to_string();
        self.with_db(move |db| db.set_focus_time(&id, new_total))
            .await
            .map_err(|e| write_failure(self.name(), task_id, new_total, e))
    }

    async fn read_focus_time(&self, task_id: &str) -> Result<Option<u64>> {
        let id = task_id.to_string();
        match self.with_db(move |db| db.focus_time(&id)).await {
            Ok(total) => Ok(Some(total)),
            Err(CoreError::TaskNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
