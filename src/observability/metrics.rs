//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_decisions_total` (counter): pipeline outcomes by `decision`
//! - `gateway_forwarded_requests_total` (counter): relayed requests by `method`, `status`
//! - `gateway_upstream_duration_seconds` (histogram): upstream round trip
//! - `gateway_logins_total` (counter): login attempts by `flow`, `result`
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Serve Prometheus metrics on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_decision(decision: &'static str) {
    counter!("gateway_decisions_total", "decision" => decision).increment(1);
}

pub fn record_forward(method: &str, status: u16, start: Instant) {
    counter!(
        "gateway_forwarded_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_upstream_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_login(flow: &'static str, result: &'static str) {
    counter!("gateway_logins_total", "flow" => flow, "result" => result).increment(1);
}
