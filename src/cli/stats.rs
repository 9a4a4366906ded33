//! Session statistics command

use super::helpers::{load_config, open_sessions, GlobalArgs};
use geotutor_core::{error::Result, FeedbackCode, SessionStats};

pub async fn handle(args: &GlobalArgs, format: &str) -> Result<()> {
    let config = load_config(args)?;
    let store = open_sessions(&config).await?;
    let stats = SessionStats::collect(&store).await?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Sessions:                 {}", stats.total_sessions);
    println!("Average answers/session:  {:.2}", stats.average_interactions);
    println!("With triangle types:      {}", stats.sessions_with_triangle_types);
    println!();
    println!("Feedback:");
    for code in FeedbackCode::ALL {
        let count = stats.feedback.get(&code.code()).copied().unwrap_or(0);
        println!("  [{}] {:<28} {}", code.code(), code.label(), count);
    }

    if !stats.helpful_theorems.is_empty() {
        println!();
        println!("Helpful theorems:");
        let mut counts: Vec<_> = stats.helpful_theorems.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        for (theorem, count) in counts {
            println!("  {:>4}  {}", theorem.to_string(), count);
        }
    }
    Ok(())
}
