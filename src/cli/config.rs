//! Configuration management command

use super::helpers::{load_config, GlobalArgs};
use clap::Subcommand;
use geotutor_core::{config::default_config_path, error::Result, TutorConfig, TutorError};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,

    /// Print the default configuration file location
    Path,

    /// Write a configuration file with default values
    Init {
        /// Destination (defaults to the standard config location)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn handle(args: &GlobalArgs, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(args)?;
            print!("{}", config.to_toml()?);
            Ok(())
        }
        ConfigAction::Path => {
            match args.config.clone().or_else(default_config_path) {
                Some(path) => println!("{}", path.display()),
                None => println!("No configuration directory available on this platform"),
            }
            Ok(())
        }
        ConfigAction::Init { output, force } => {
            let path = output
                .or_else(|| args.config.clone())
                .or_else(default_config_path)
                .ok_or_else(|| {
                    TutorError::InvalidInput("no configuration path; use --output".to_string())
                })?;
            if path.exists() && !force {
                return Err(TutorError::InvalidInput(format!(
                    "{} already exists; use --force to overwrite",
                    path.display()
                )));
            }
            TutorConfig::default().to_file(&path)?;
            println!("Configuration written to {}", path.display());
            Ok(())
        }
    }
}
