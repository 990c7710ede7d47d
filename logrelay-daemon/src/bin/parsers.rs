use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use logrelay_daemon::cli::ParsersCli;
use logrelay_daemon::{stages, startup};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = ParsersCli::parse();

    let Some(config) = startup::bootstrap(&cli.common, "logrelay-parsers")? else {
        return Ok(());
    };

    let shutdown = CancellationToken::new();
    let watcher = stages::spawn_signal_watcher(shutdown.clone());

    let result = stages::run_parsers(config, cli.limits.to_limits(), shutdown.clone()).await;

    shutdown.cancel();
    let _ = watcher.await;
    result.map(|_| ())
}
