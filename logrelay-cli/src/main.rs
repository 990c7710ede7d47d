//! logrelay CLI: submit one raw message to the parser queue.

mod cli;
mod error;
mod output;
mod submit;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so the receipt on stdout stays parseable.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let writer = OutputWriter::new(cli.output);
    if let Err(e) = submit::execute(&cli, &writer).await {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}
