//! Session stores: where closed interaction logs go.
//!
//! Logs are stored as JSON; the feedback code is duplicated into its own
//! column so statistics can group on it without decoding.

use super::InteractionLog;
use crate::error::Result;
use crate::knowledge::schema::init_session_tables;
use crate::storage::{open_pool, with_conn, DEFAULT_POOL_SIZE};
use async_trait::async_trait;
use deadpool_sqlite::Pool;
use rusqlite::params;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Persistence for finished sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Save a closed session's log. Saving the same session twice replaces
    /// the earlier record.
    async fn save(&self, log: &InteractionLog) -> Result<()>;

    /// All stored logs, oldest first
    async fn load_all(&self) -> Result<Vec<InteractionLog>>;

    async fn count(&self) -> Result<usize>;

    /// Delete every stored log, returning how many were removed
    async fn clear(&self) -> Result<usize>;
}

/// Session logs in a SQLite `sessions` table
pub struct SqliteSessionStore {
    pool: Pool,
}

impl SqliteSessionStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        Ok(Self {
            pool: open_pool(db_path, DEFAULT_POOL_SIZE)?,
        })
    }

    pub async fn init_schema(&self) -> Result<()> {
        with_conn(&self.pool, "initialize session schema", |conn| {
            init_session_tables(conn)
        })
        .await
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn save(&self, log: &InteractionLog) -> Result<()> {
        let data = serde_json::to_string(log)?;
        let session_id = log.session_id.to_string();
        let feedback = log.feedback.map(u8::from);
        let ended_at = log.ended_at.unwrap_or_else(chrono::Utc::now).timestamp();

        with_conn(&self.pool, "save session", move |conn| {
            conn.execute(
                "INSERT INTO sessions (session_id, feedback, data, ended_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(session_id) DO UPDATE SET
                     feedback = excluded.feedback,
                     data = excluded.data,
                     ended_at = excluded.ended_at",
                params![session_id, feedback, data, ended_at],
            )
        })
        .await?;

        debug!("Saved session {}", log.session_id);
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<InteractionLog>> {
        let rows: Vec<String> = with_conn(&self.pool, "load sessions", |conn| {
            let mut stmt = conn.prepare("SELECT data FROM sessions ORDER BY id")?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await?;

        let logs = rows
            .iter()
            .map(|data| serde_json::from_str(data))
            .collect::<std::result::Result<Vec<InteractionLog>, _>>()?;
        debug!("Loaded {} sessions", logs.len());
        Ok(logs)
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = with_conn(&self.pool, "count sessions", |conn| {
            conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
        })
        .await?;
        Ok(count as usize)
    }

    async fn clear(&self) -> Result<usize> {
        let removed = with_conn(&self.pool, "clear sessions", |conn| {
            conn.execute("DELETE FROM sessions", [])
        })
        .await?;
        info!("Cleared {} stored sessions", removed);
        Ok(removed)
    }
}

/// In-memory session store for tests and ephemeral runs
#[derive(Default)]
pub struct MemorySessionStore {
    logs: RwLock<Vec<InteractionLog>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(&self, log: &InteractionLog) -> Result<()> {
        let mut logs = self.logs.write().await;
        match logs.iter_mut().find(|l| l.session_id == log.session_id) {
            Some(existing) => *existing = log.clone(),
            None => logs.push(log.clone()),
        }
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<InteractionLog>> {
        Ok(self.logs.read().await.clone())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.logs.read().await.len())
    }

    async fn clear(&self) -> Result<usize> {
        let mut logs = self.logs.write().await;
        let removed = logs.len();
        logs.clear();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnswerId, FeedbackCode, QuestionId, SessionId, TheoremId, TriangleId};
    use tempfile::TempDir;

    fn closed_log(feedback: FeedbackCode) -> InteractionLog {
        let mut log = InteractionLog::new(SessionId::new());
        log.record(QuestionId(1), AnswerId(1));
        log.record(QuestionId(2), AnswerId(0));
        log.finalize(feedback, vec![TriangleId(2)], vec![TheoremId(2)]);
        log
    }

    async fn create_store() -> (SqliteSessionStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteSessionStore::new(temp_dir.path().join("sessions.db")).unwrap();
        store.init_schema().await.unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_sqlite_save_and_load() {
        let (store, _temp) = create_store().await;
        let first = closed_log(FeedbackCode::Succeeded);
        let second = closed_log(FeedbackCode::Retry);

        store.save(&first).await.unwrap();
        store.save(&second).await.unwrap();

        let logs = store.load_all().await.unwrap();
        assert_eq!(logs, vec![first, second]);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_sqlite_save_is_idempotent_per_session() {
        let (store, _temp) = create_store().await;
        let log = closed_log(FeedbackCode::Succeeded);

        store.save(&log).await.unwrap();
        store.save(&log).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sqlite_clear() {
        let (store, _temp) = create_store().await;
        store.save(&closed_log(FeedbackCode::Succeeded)).await.unwrap();
        store.save(&closed_log(FeedbackCode::ProgressedNewExercise)).await.unwrap();

        assert_eq!(store.clear().await.unwrap(), 2);
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemorySessionStore::new();
        let log = closed_log(FeedbackCode::Succeeded);

        store.save(&log).await.unwrap();
        store.save(&log).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.clear().await.unwrap(), 1);
    }
}
