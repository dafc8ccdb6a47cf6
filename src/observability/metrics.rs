//! Metrics collection and exposition.
//!
//! # Metrics
//! - `rpc_http_requests_total` (counter): requests by method and status
//! - `rpc_http_request_duration_seconds` (histogram): latency by method
//! - `rpc_admission_total` (counter): gate decisions by gate and outcome

use std::net::SocketAddr;
use std::time::Instant;

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::observability::events::Gate;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "rpc_http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("rpc_http_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_admission(gate: Gate, outcome: &'static str) {
    metrics::counter!("rpc_admission_total", "gate" => gate.as_str(), "outcome" => outcome)
        .increment(1);
}

/// Outermost middleware recording status and latency of every response.
pub async fn track_requests(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let response = next.run(request).await;
    record_request(&method, response.status().as_u16(), start);
    response
}
