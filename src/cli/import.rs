//! Knowledge import command

use super::helpers::{load_config, open_knowledge, GlobalArgs};
use geotutor_core::{error::Result, KnowledgeSeed, KnowledgeStore};
use std::path::Path;
use tracing::info;

/// Validate a JSON seed file and replace the knowledge tables with it
pub async fn handle(args: &GlobalArgs, file: &Path) -> Result<()> {
    let config = load_config(args)?;
    let seed = KnowledgeSeed::from_file(file)?;
    let snapshot = seed.into_snapshot()?;

    let source = open_knowledge(&config)?;
    source.init_schema().await?;
    source.import_snapshot(&snapshot).await?;

    info!("Imported {}", file.display());
    println!(
        "Imported {} questions ({} active), {} theorems, {} initial multipliers into {}",
        snapshot.questions().count(),
        snapshot.active_questions().len(),
        snapshot.theorems().count(),
        snapshot.multipliers().initial().len(),
        config.storage.knowledge_db.display()
    );
    Ok(())
}
