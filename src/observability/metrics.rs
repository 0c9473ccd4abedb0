//! Metrics collection and exposition.
//!
//! # Metrics
//! - `staking_api_requests_total` (counter): requests by route, status
//! - `staking_api_request_duration_seconds` (histogram): latency distribution
//! - `staking_api_chain_calls_total` (counter): chain calls by network, operation, outcome
//! - `staking_api_registrations_total` (counter): registration outcomes by network
//! - `staking_api_chain_connected` (gauge): 1=connected, 0=disconnected
//! - `staking_api_network_fallbacks_total` (counter): selector fallbacks to the default network

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed HTTP request.
pub fn record_request(route: &str, status: u16, start: Instant) {
    counter!(
        "staking_api_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("staking_api_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record the outcome of a chain call.
pub fn record_chain_call(network: &str, operation: &'static str, ok: bool) {
    counter!(
        "staking_api_chain_calls_total",
        "network" => network.to_string(),
        "operation" => operation,
        "outcome" => if ok { "ok" } else { "error" }
    )
    .increment(1);
}

/// Record the connection state of a network's client.
pub fn record_chain_connected(network: &str, connected: bool) {
    gauge!("staking_api_chain_connected", "network" => network.to_string())
        .set(if connected { 1.0 } else { 0.0 });
}

/// Record a dapp registration outcome ("approved", "rejected", "error").
pub fn record_registration(network: &str, outcome: &'static str) {
    counter!(
        "staking_api_registrations_total",
        "network" => network.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a lookup that fell back to the default network.
pub fn record_network_fallback(requested: &str) {
    counter!(
        "staking_api_network_fallbacks_total",
        "requested" => requested.to_string()
    )
    .increment(1);
}
