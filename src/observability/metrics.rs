//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): data-plane requests by status
//! - `gateway_reloads_total` (counter): hot-reload attempts by outcome
//! - `gateway_routes` (gauge): registered routes
//!
//! Without an installed recorder every update is a no-op.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(status: u16) {
    metrics::counter!("gateway_requests_total", "status" => status.to_string()).increment(1);
}

pub fn record_reload(outcome: &'static str) {
    metrics::counter!("gateway_reloads_total", "outcome" => outcome).increment(1);
}

pub fn set_route_count(count: usize) {
    metrics::gauge!("gateway_routes").set(count as f64);
}
