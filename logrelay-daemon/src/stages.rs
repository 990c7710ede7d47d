//! Stage runners behind the three binaries.
//!
//! Each runner connects to the broker, resolves its plugins and runs until
//! SIGTERM/SIGINT or its bounded-mode limit. Any failure before the first
//! task is consumed is returned so the process exits nonzero.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use logrelay_core::Config;
use logrelay_pipeline::{
    InputReport, InputRunner, PluginRegistry, PluginResolver, PoolReport, StageDispatcher,
    WorkerLimits, connect,
};

/// Build the dispatcher for a worker process.
pub fn dispatcher(config: Arc<Config>, limits: WorkerLimits) -> Result<StageDispatcher> {
    let broker = connect(&config.broker_url, &config.broker_options)
        .map_err(|e| anyhow::anyhow!("failed to connect to broker: {}", e))?;
    let registry = Arc::new(PluginRegistry::with_builtins());
    Ok(StageDispatcher::new(config, registry, broker).limits(limits))
}

/// Run the parser worker pool.
pub async fn run_parsers(
    config: Arc<Config>,
    limits: WorkerLimits,
    shutdown: CancellationToken,
) -> Result<PoolReport> {
    let dispatcher = dispatcher(config, limits)?;
    let report = dispatcher
        .run_parsers(shutdown)
        .await
        .map_err(|e| anyhow::anyhow!("parser workers failed: {}", e))?;

    let total = report.total();
    tracing::info!(
        consumed = total.consumed,
        published = total.published,
        dropped = total.dropped,
        requeued = total.requeued,
        dead_lettered = total.dead_lettered,
        "parser workers stopped"
    );
    Ok(report)
}

/// Run the output worker pool.
pub async fn run_outputers(
    config: Arc<Config>,
    limits: WorkerLimits,
    shutdown: CancellationToken,
) -> Result<PoolReport> {
    let dispatcher = dispatcher(config, limits)?;
    let report = dispatcher
        .run_outputs(shutdown)
        .await
        .map_err(|e| anyhow::anyhow!("output workers failed: {}", e))?;

    let total = report.total();
    tracing::info!(
        consumed = total.consumed,
        fanned_out = total.fanned_out,
        requeued = total.requeued,
        dead_lettered = total.dead_lettered,
        "output workers stopped"
    );
    Ok(report)
}

/// Run the configured inputs.
pub async fn run_inputs(
    config: Arc<Config>,
    interval: Duration,
    max_iterations: Option<u64>,
    shutdown: CancellationToken,
) -> Result<InputReport> {
    let broker = connect(&config.broker_url, &config.broker_options)
        .map_err(|e| anyhow::anyhow!("failed to connect to broker: {}", e))?;
    let registry = Arc::new(PluginRegistry::with_builtins());
    let resolver = PluginResolver::new(registry, &config);

    let mut runner = InputRunner::from_config(&config, &resolver, broker)
        .map_err(|e| anyhow::anyhow!("failed to start inputs: {}", e))?
        .interval(interval)
        .max_iterations(max_iterations);

    tracing::info!(inputs = runner.input_count(), queue = %config.parser_queue, "inputs running");

    let report = runner
        .run(shutdown)
        .await
        .map_err(|e| anyhow::anyhow!("inputs failed: {}", e))?;

    tracing::info!(
        iterations = report.iterations,
        published = report.published,
        poll_failures = report.poll_failures,
        "inputs stopped"
    );
    Ok(report)
}

/// Cancel `token` when the process receives SIGTERM or SIGINT.
///
/// The returned task ends on its own once the token is cancelled elsewhere.
pub fn spawn_signal_watcher(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            result = wait_for_shutdown_signal() => {
                match result {
                    Ok(signal) => tracing::info!(signal, "shutdown signal received"),
                    Err(e) => tracing::error!(error = %e, "failed to listen for shutdown signals"),
                }
                token.cancel();
            }
        }
    })
}

/// Wait for a shutdown signal and return its name.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(name)
}

/// Wait for a shutdown signal and return its name.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}
