//! CLI command handlers
//!
//! Each subcommand is implemented in its own module.

pub mod calibrate;
pub mod clear_sessions;
pub mod config;
pub mod helpers;
pub mod import;
pub mod init;
pub mod play;
pub mod stats;
