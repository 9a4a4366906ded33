//! Database initialization command

use super::helpers::{load_config, open_knowledge, open_sessions, GlobalArgs};
use geotutor_core::error::Result;
use tracing::debug;

/// Create the knowledge and session schemas
pub async fn handle(args: &GlobalArgs) -> Result<()> {
    let config = load_config(args)?;

    debug!("Initializing knowledge database...");
    let knowledge = open_knowledge(&config)?;
    knowledge.init_schema().await?;

    debug!("Initializing sessions database...");
    open_sessions(&config).await?;

    println!(
        "Knowledge database initialized: {}",
        config.storage.knowledge_db.display()
    );
    println!(
        "Sessions database initialized: {}",
        config.storage.sessions_db.display()
    );
    Ok(())
}
