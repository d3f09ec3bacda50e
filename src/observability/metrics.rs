//! Metrics collection and exposition.
//!
//! # Metrics
//! - `origin_requests_total` (counter): responses sent, by method and status
//! - `origin_request_duration_seconds` (histogram): parse to response written
//! - `origin_connections_rejected_total` (counter): 503s from the admission gate
//! - `origin_active_connections` (gauge): admitted, unfinished connections
//! - `origin_uploaded_files_total` (counter): multipart file parts saved
//!
//! Recording is a no-op until [`init_metrics`] installs an exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    metrics::histogram!(
        "origin_request_duration_seconds",
        "method" => method.clone(),
        "status" => status.clone()
    )
    .record(start.elapsed().as_secs_f64());
    metrics::counter!("origin_requests_total", "method" => method, "status" => status).increment(1);
}

pub fn record_rejected() {
    metrics::counter!("origin_connections_rejected_total").increment(1);
}

pub fn set_active_connections(count: usize) {
    metrics::gauge!("origin_active_connections").set(count as f64);
}

pub fn record_upload() {
    metrics::counter!("origin_uploaded_files_total").increment(1);
}
