use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use logrelay_daemon::cli::OutputersCli;
use logrelay_daemon::{stages, startup};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = OutputersCli::parse();

    let Some(config) = startup::bootstrap(&cli.common, "logrelay-outputers")? else {
        return Ok(());
    };

    let shutdown = CancellationToken::new();
    let watcher = stages::spawn_signal_watcher(shutdown.clone());

    let result = stages::run_outputers(config, cli.limits.to_limits(), shutdown.clone()).await;

    shutdown.cancel();
    let _ = watcher.await;
    result.map(|_| ())
}
