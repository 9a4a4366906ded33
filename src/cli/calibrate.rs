//! Offline calibration command

use super::helpers::{load_config, load_knowledge, open_sessions, GlobalArgs};
use geotutor_core::{default_jobs, error::Result, run_calibration, SharedKnowledge};
use tracing::info;

/// Recompute dynamic multipliers, theorem scores and general helpfulness
/// from stored sessions and write them to the knowledge database
pub async fn handle(args: &GlobalArgs, dry_run: bool) -> Result<()> {
    let config = load_config(args)?;
    let (source, snapshot) = load_knowledge(&config).await?;
    let sessions = open_sessions(&config).await?;

    let shared = SharedKnowledge::new(snapshot);
    let jobs = default_jobs(&config.calibration);
    let outcome = run_calibration(&shared, &sessions, &jobs).await?;

    if outcome.reports.is_empty() {
        println!("No stored sessions; nothing to calibrate.");
        return Ok(());
    }

    for report in &outcome.reports {
        println!(
            "{:<22} {:>6} records from {} sessions ({} ms)",
            report.job,
            report.records,
            report.sessions_processed,
            report.duration.as_millis()
        );
    }

    if dry_run {
        println!("Dry run: knowledge database left unchanged.");
        return Ok(());
    }

    for update in &outcome.updates {
        update.persist(&source).await?;
    }
    info!("Calibration written to {}", config.storage.knowledge_db.display());
    println!(
        "Calibration written to {}",
        config.storage.knowledge_db.display()
    );
    Ok(())
}
