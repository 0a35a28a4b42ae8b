//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "probe", version, about = "Load-cell probe analysis CLI")]
pub struct Cli {
    /// Path to config TOML; built-in defaults when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print results and errors as JSON instead of text
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyse a recorded probe trace (CSV with headers `z,load`)
    Analyse {
        /// Trace to replay through the engine
        #[arg(long, value_name = "FILE")]
        trace: PathBuf,
        /// Also print the computed features
        #[arg(long, action = ArgAction::SetTrue)]
        features: bool,
    },
    /// Run the engine on a built-in synthetic probe and check it is accepted
    SelfCheck,
}
