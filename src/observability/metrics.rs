//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway request metrics
//! - Expose a Prometheus-compatible scrape endpoint
//!
//! # Metrics
//! - `filegate_requests_total` (counter): requests by backend kind and status
//! - `filegate_request_duration_seconds` (histogram): latency by backend kind
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Labels limited to backend kind and status to bound cardinality

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one finished request.
pub fn record_request(backend: &'static str, status: u16, start: Instant) {
    let status = status.to_string();
    metrics::counter!("filegate_requests_total", "backend" => backend, "status" => status).increment(1);
    metrics::histogram!("filegate_request_duration_seconds", "backend" => backend)
        .record(start.elapsed().as_secs_f64());
}
