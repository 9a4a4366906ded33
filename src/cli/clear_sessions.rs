//! Delete every stored session

use super::helpers::{load_config, open_sessions, prompt, GlobalArgs};
use geotutor_core::{error::Result, SessionStore};

pub async fn handle(args: &GlobalArgs, yes: bool) -> Result<()> {
    let config = load_config(args)?;
    let store = open_sessions(&config).await?;

    let count = store.count().await?;
    if count == 0 {
        println!("No stored sessions.");
        return Ok(());
    }

    if !yes {
        let answer = prompt(&format!("Delete {} stored sessions? [y/N]: ", count))?
            .unwrap_or_default();
        if !answer.eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let removed = store.clear().await?;
    println!("Deleted {} sessions.", removed);
    Ok(())
}
