//! geotutor - Adaptive Geometry Theorem Tutor
//!
//! Command-line entry point: database setup, knowledge import, interactive
//! sessions, offline calibration and session statistics.

mod cli;

use clap::{Parser, Subcommand};
use cli::config::ConfigAction;
use cli::helpers::GlobalArgs;
use std::path::PathBuf;
use tracing::{debug, Level};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(name = "geotutor")]
#[command(about = "Adaptive geometry theorem tutor", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Configuration file (defaults to the standard config location)
    #[arg(long, env = "GEOTUTOR_CONFIG")]
    config: Option<PathBuf>,

    /// Knowledge database path (overrides the configuration)
    #[arg(long, env = "GEOTUTOR_KNOWLEDGE_DB")]
    knowledge_db: Option<PathBuf>,

    /// Sessions database path (overrides the configuration)
    #[arg(long, env = "GEOTUTOR_SESSIONS_DB")]
    sessions_db: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the knowledge and sessions databases
    Init,

    /// Replace the knowledge tables with a JSON seed file
    Import {
        /// Seed file
        file: PathBuf,
    },

    /// Run an interactive tutoring session
    Play {
        /// Number of ranked theorems to show after each answer
        #[arg(short, long, default_value = "5")]
        top: usize,
    },

    /// Recalibrate multipliers and theorem scores from stored sessions
    Calibrate {
        /// Compute and report without writing to the database
        #[arg(long)]
        dry_run: bool,
    },

    /// Show statistics over stored sessions
    Stats {
        /// Output format (text or json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Delete every stored session
    ClearSessions {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::new(format!(
        "geotutor={level},geotutor_core={level}",
        level = level.as_str().to_lowercase()
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // Write logs to stderr, not stdout
        .init();

    debug!("geotutor v{} starting...", env!("CARGO_PKG_VERSION"));

    let args = GlobalArgs {
        config: cli.config,
        knowledge_db: cli.knowledge_db,
        sessions_db: cli.sessions_db,
    };

    match cli.command {
        Commands::Init => cli::init::handle(&args).await?,
        Commands::Import { file } => cli::import::handle(&args, &file).await?,
        Commands::Play { top } => cli::play::handle(&args, top).await?,
        Commands::Calibrate { dry_run } => cli::calibrate::handle(&args, dry_run).await?,
        Commands::Stats { format } => cli::stats::handle(&args, &format).await?,
        Commands::ClearSessions { yes } => cli::clear_sessions::handle(&args, yes).await?,
        Commands::Config { action } => cli::config::handle(&args, action).await?,
    }
    Ok(())
}
