//! Metrics collection and exposition.
//!
//! # Metrics
//! - `routemux_dispatch_total` (counter): dispatch decisions by outcome
//! - `routemux_match_duration_seconds` (histogram): time spent matching
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - The Prometheus exporter is only installed by the `serve` command

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Count one dispatch decision.
pub fn record_dispatch(outcome: &'static str) {
    counter!("routemux_dispatch_total", "outcome" => outcome).increment(1);
}

/// Record how long the route scan took.
pub fn record_match_duration(elapsed: Duration) {
    histogram!("routemux_match_duration_seconds").record(elapsed.as_secs_f64());
}

/// Install the global Prometheus recorder with a scrape endpoint on `addr`.
/// Must be called from within a Tokio runtime.
pub fn install_exporter(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
}
