//! Shared helper functions for CLI commands

use geotutor_core::{
    error::Result, KnowledgeSnapshot, SqliteKnowledgeSource, SqliteSessionStore, TutorConfig,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Global options every command may override
#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    pub config: Option<PathBuf>,
    pub knowledge_db: Option<PathBuf>,
    pub sessions_db: Option<PathBuf>,
}

/// Load the layered configuration and apply command-line overrides
pub fn load_config(args: &GlobalArgs) -> Result<TutorConfig> {
    let mut config = TutorConfig::load(args.config.as_deref())?;
    if let Some(path) = &args.knowledge_db {
        config.storage.knowledge_db = path.clone();
    }
    if let Some(path) = &args.sessions_db {
        config.storage.sessions_db = path.clone();
    }
    debug!(
        "Knowledge database: {}, sessions database: {}",
        config.storage.knowledge_db.display(),
        config.storage.sessions_db.display()
    );
    Ok(config)
}

/// Create the parent directory of a database file if needed
pub fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

pub fn open_knowledge(config: &TutorConfig) -> Result<SqliteKnowledgeSource> {
    ensure_parent(&config.storage.knowledge_db)?;
    SqliteKnowledgeSource::with_pool_size(&config.storage.knowledge_db, config.storage.pool_size)
}

pub async fn open_sessions(config: &TutorConfig) -> Result<SqliteSessionStore> {
    ensure_parent(&config.storage.sessions_db)?;
    let store = SqliteSessionStore::new(&config.storage.sessions_db)?;
    store.init_schema().await?;
    Ok(store)
}

/// Open the knowledge database and load its current snapshot
pub async fn load_knowledge(
    config: &TutorConfig,
) -> Result<(SqliteKnowledgeSource, KnowledgeSnapshot)> {
    let source = open_knowledge(config)?;
    source.init_schema().await?;
    let snapshot = source.load_snapshot().await?;
    Ok((source, snapshot))
}

/// Print `message` and read one trimmed line from stdin.
/// Returns `None` at end of input.
pub fn prompt(message: &str) -> Result<Option<String>> {
    print!("{}", message);
    std::io::stdout().flush()?;
    let mut input = String::new();
    if std::io::stdin().read_line(&mut input)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}

/// Parse a comma or space separated list of numeric ids
pub fn parse_ids<T: From<u32>>(input: &str) -> std::result::Result<Vec<T>, String> {
    input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u32>()
                .map(T::from)
                .map_err(|_| format!("'{}' is not a number", part))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geotutor_core::TriangleId;

    #[test]
    fn test_parse_ids() {
        let ids: Vec<TriangleId> = parse_ids("1, 2 3").unwrap();
        assert_eq!(ids, vec![TriangleId(1), TriangleId(2), TriangleId(3)]);
        assert!(parse_ids::<TriangleId>("").unwrap().is_empty());
        assert!(parse_ids::<TriangleId>("1,x").is_err());
    }
}
