//! Prometheus metrics HTTP server.
//!
//! Uses the built-in HTTP listener from `metrics-exporter-prometheus`.
//! Installed only when `metrics_addr` is set; without a recorder every
//! `metrics::counter!()` call is a no-op.

use std::net::SocketAddr;

use anyhow::Result;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};

use logrelay_core::metrics as m;

/// Parse a `host:port` listen address.
pub fn parse_listen_addr(addr: &str) -> Result<SocketAddr> {
    addr.parse()
        .map_err(|e| anyhow::anyhow!("invalid metrics listen address '{}': {}", addr, e))
}

/// Install the global metrics recorder and start the HTTP listener.
///
/// This function should be called once per process.
///
/// # Errors
///
/// - Address is not a valid `host:port`
/// - Socket binding fails
/// - Global recorder is already installed
pub fn install_metrics_recorder(addr: &str) -> Result<()> {
    let addr = parse_listen_addr(addr)?;

    if addr.ip().is_unspecified() {
        tracing::warn!(
            listen_addr = %addr,
            "metrics endpoint is exposed on all interfaces; restrict metrics_addr in untrusted networks"
        );
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full(m::WORKER_TASK_DURATION_SECONDS.to_owned()),
            m::TASK_DURATION_BUCKETS,
        )
        .map_err(|e| anyhow::anyhow!("invalid histogram buckets: {}", e))?
        .install()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {}", e))?;

    m::describe_all();

    tracing::info!(listen_addr = %addr, "Prometheus metrics endpoint active");
    Ok(())
}
