//! Metrics collection and exposition.
//!
//! # Metrics
//! - `api_requests_total` (counter): requests by endpoint, status
//! - `api_request_duration_seconds` (histogram): latency by endpoint
//! - `api_admission_rejected_total` (counter): 503s from admission control
//!
//! # Design Decisions
//! - Prometheus exposition on its own listener, off the request path
//! - Endpoint label is the matched route name, never the raw path, to keep
//!   cardinality bounded

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and exposition endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(error) => tracing::error!(error = %error, "Failed to install metrics exporter"),
    }
}

/// Record one completed request.
pub fn record_request(endpoint: &str, status: u16, start: Instant) {
    let labels = [
        ("endpoint", endpoint.to_string()),
        ("status", status.to_string()),
    ];
    metrics::counter!("api_requests_total", &labels).increment(1);
    metrics::histogram!("api_request_duration_seconds", "endpoint" => endpoint.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record a request rejected by load-average admission control.
pub fn record_admission_rejected(endpoint: &str) {
    metrics::counter!("api_admission_rejected_total", "endpoint" => endpoint.to_string())
        .increment(1);
}
