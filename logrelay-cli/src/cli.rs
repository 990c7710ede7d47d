//! CLI argument definitions using clap derive.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

/// Message used when none is given on the command line.
pub const DEFAULT_MESSAGE: &str = "test message";

/// logrelay CLI -- publish one raw message to the parser queue
#[derive(Parser, Debug)]
#[command(name = "logrelay-cli", version, about, long_about = None)]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// Raw message to submit
    #[arg(default_value = DEFAULT_MESSAGE)]
    pub message: String,

    /// Print version and exit
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    pub version: Option<bool>,

    /// Path to a YAML or TOML settings file (overrides LOGRELAY_CONFIG_FILE)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Parser list for this message only, as JSON (e.g. '["plain"]')
    #[arg(long, value_name = "JSON")]
    pub parsers: Option<String>,

    /// Log level for the CLI itself
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

/// Output format for the submission receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON for scripting
    Json,
}
