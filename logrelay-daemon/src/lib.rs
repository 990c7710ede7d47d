//! logrelay stage processes.
//!
//! Each binary runs one stage of the pipeline against the configured broker:
//!
//! - `logrelay-parsers`: parser worker pool on `parser_queue`
//! - `logrelay-outputers`: output worker pool on `output_queue`
//! - `logrelay-inputs`: polls configured inputs and feeds `parser_queue`
//!
//! The library exposes the shared startup code so it can be tested without
//! spawning processes.

pub mod cli;
pub mod logging;
pub mod metrics_server;
pub mod stages;
pub mod startup;
