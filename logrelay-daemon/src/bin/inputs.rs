use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use logrelay_daemon::cli::InputsCli;
use logrelay_daemon::{stages, startup};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = InputsCli::parse();

    let Some(config) = startup::bootstrap(&cli.common, "logrelay-inputs")? else {
        return Ok(());
    };

    let shutdown = CancellationToken::new();
    let watcher = stages::spawn_signal_watcher(shutdown.clone());

    let result =
        stages::run_inputs(config, cli.interval(), cli.max_iterations, shutdown.clone()).await;

    shutdown.cancel();
    let _ = watcher.await;
    result.map(|_| ())
}
