//! Metrics collection and exposition.
//!
//! # Metrics
//! - `router_requests_total` (counter): requests by outcome and status
//! - `router_request_duration_seconds` (histogram): dispatch latency
//! - `router_reloads_total` (counter): reloads by result
//! - `router_generation` (gauge): generation of the installed table

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one dispatched request.
pub fn record_dispatch(outcome: &'static str, status: u16, start: Instant) {
    counter!(
        "router_requests_total",
        "outcome" => outcome,
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("router_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

/// Record a reload attempt.
pub fn record_reload(success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!("router_reloads_total", "result" => result).increment(1);
}

pub fn set_generation(generation: u64) {
    gauge!("router_generation").set(generation as f64);
}
