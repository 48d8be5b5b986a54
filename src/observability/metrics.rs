//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define module metrics (requests, latency, auth failures, running state)
//! - Expose a Prometheus-compatible scrape endpoint
//!
//! # Metrics
//! - `module_requests_total` (counter): requests by module, endpoint, status
//! - `module_request_duration_seconds` (histogram): latency distribution
//! - `module_auth_failures_total` (counter): rejected credentials by module
//! - `module_running` (gauge): 1 while the module serves, 0 otherwise
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   exporter every call is a no-op
//! - Labels stay low-cardinality: endpoint names, never raw paths

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter with its own HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one finished request.
pub fn record_request(module: &str, endpoint: &str, status: u16, start: Instant) {
    let module = module.to_string();
    let endpoint = endpoint.to_string();
    ::metrics::counter!(
        "module_requests_total",
        "module" => module.clone(),
        "endpoint" => endpoint.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!(
        "module_request_duration_seconds",
        "module" => module,
        "endpoint" => endpoint
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_auth_failure(module: &str) {
    ::metrics::counter!("module_auth_failures_total", "module" => module.to_string()).increment(1);
}

pub fn set_running(module: &str, running: bool) {
    ::metrics::gauge!("module_running", "module" => module.to_string())
        .set(if running { 1.0 } else { 0.0 });
}
