//! Metrics collection and exposition.
//!
//! # Metrics
//! - `campus_requests_total` (counter): requests by method, route, status
//! - `campus_request_duration_seconds` (histogram): latency by method, route
//! - `campus_chain_calls_total` (counter): contract calls by contract, outcome
//! - `campus_dual_write_divergence_total` (counter): chain succeeded, DB write failed
//! - `campus_chain_healthy` (gauge): 1=healthy, 0=unhealthy
//!
//! Recording is a no-op until [`init_metrics`] installs the Prometheus recorder.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    let method = method.to_string();
    let route = route.to_string();
    counter!(
        "campus_requests_total",
        "method" => method.clone(),
        "route" => route.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("campus_request_duration_seconds", "method" => method, "route" => route)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_chain_call(contract: &'static str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!("campus_chain_calls_total", "contract" => contract, "outcome" => outcome)
        .increment(1);
}

/// Count an operation whose contract call landed but whose row did not.
pub fn record_dual_write_divergence(operation: &'static str) {
    counter!("campus_dual_write_divergence_total", "operation" => operation).increment(1);
}

pub fn record_chain_health(healthy: bool) {
    gauge!("campus_chain_healthy").set(if healthy { 1.0 } else { 0.0 });
}
