//! CLI argument definitions for the stage binaries.
//!
//! Uses `clap` v4 derive macros. All binaries share [`CommonArgs`]; `-v` is
//! the version flag, so clap's default `-V` is disabled.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser};
use logrelay_pipeline::WorkerLimits;

/// Arguments shared by every stage binary.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Print version and exit.
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    pub version: Option<bool>,

    /// Path to a YAML or TOML settings file.
    ///
    /// Takes precedence over the LOGRELAY_CONFIG_FILE environment variable.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate the settings file and exit without starting workers.
    #[arg(long)]
    pub validate: bool,
}

/// Bounded-mode arguments for worker pools.
#[derive(Args, Debug, Clone, Default)]
pub struct LimitArgs {
    /// Stop each worker after this many tasks.
    #[arg(long, value_name = "N")]
    pub max_tasks: Option<u64>,

    /// Stop each worker after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub max_runtime_secs: Option<u64>,
}

impl LimitArgs {
    /// Convert to pool limits. No flags means run until shutdown.
    pub fn to_limits(&self) -> WorkerLimits {
        WorkerLimits {
            max_tasks: self.max_tasks,
            max_runtime: self.max_runtime_secs.map(Duration::from_secs),
        }
    }
}

/// Parser worker pool.
///
/// Consumes raw messages from the parser queue, runs the configured parser
/// chain and publishes resulting events to the output queue.
#[derive(Parser, Debug)]
#[command(name = "logrelay-parsers", version, about, long_about = None)]
#[command(disable_version_flag = true)]
pub struct ParsersCli {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub limits: LimitArgs,
}

/// Output worker pool.
///
/// Consumes events from the output queue and hands each one to every
/// configured outputer.
#[derive(Parser, Debug)]
#[command(name = "logrelay-outputers", version, about, long_about = None)]
#[command(disable_version_flag = true)]
pub struct OutputersCli {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub limits: LimitArgs,
}

/// Input collectors.
///
/// Polls the configured inputs and publishes every collected line to the
/// parser queue.
#[derive(Parser, Debug)]
#[command(name = "logrelay-inputs", version, about, long_about = None)]
#[command(disable_version_flag = true)]
pub struct InputsCli {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Stop after this many polling rounds.
    #[arg(long, value_name = "N")]
    pub max_iterations: Option<u64>,

    /// Delay between polling rounds in milliseconds.
    #[arg(
        long,
        value_name = "MS",
        default_value_t = 1000,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub interval_ms: u64,
}

impl InputsCli {
    /// Polling interval.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}
