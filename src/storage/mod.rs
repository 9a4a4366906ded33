//! SQLite plumbing shared by the knowledge and session stores
//!
//! Both stores run on a deadpool-sqlite connection pool; blocking rusqlite
//! calls are moved onto the pool's worker threads with `interact`.

use crate::error::{Result, TutorError};
use deadpool_sqlite::{Config, Pool, Runtime};
use std::path::Path;
use tracing::info;

/// Default connection pool size
pub const DEFAULT_POOL_SIZE: usize = 8;

/// Create a connection pool for the database at `db_path`
pub fn open_pool<P: AsRef<Path>>(db_path: P, pool_size: usize) -> Result<Pool> {
    let path_str = db_path.as_ref().to_string_lossy().to_string();
    info!(
        "Creating SQLite pool at: {} (pool_size: {})",
        path_str, pool_size
    );

    let mut config = Config::new(path_str);
    config.pool = Some(deadpool_sqlite::PoolConfig::new(pool_size));
    config
        .create_pool(Runtime::Tokio1)
        .map_err(|e| TutorError::Database(format!("Failed to create connection pool: {}", e)))
}

/// Run `f` on a pooled connection.
///
/// `op` names the operation in the error message if rusqlite fails.
pub async fn with_conn<T, F>(pool: &Pool, op: &'static str, f: F) -> Result<T>
where
    F: FnOnce(&mut rusqlite::Connection) -> rusqlite::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let conn = pool.get().await.map_err(|e| {
        TutorError::Database(format!("Failed to get connection from pool: {}", e))
    })?;

    conn.interact(f)
        .await
        .map_err(|e| TutorError::Database(format!("Pool interaction failed: {}", e)))?
        .map_err(|e| TutorError::Database(format!("Failed to {}: {}", op, e)))
}
