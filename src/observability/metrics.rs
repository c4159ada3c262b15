//! Metrics collection and exposition.
//!
//! # Metrics
//! - `sentinel_polls_total` (counter): poll cycles started
//! - `sentinel_feed_failures_total` (counter): cycles without data
//! - `sentinel_decisions_total` (counter): decisions by kind
//! - `sentinel_upstream_edits_total` (counter): edits by action, outcome
//! - `sentinel_reloads_total` (counter): reloads by outcome
//! - `sentinel_instances_tracked` (gauge): instances with runtime state
//! - `sentinel_instances_removed` (gauge): instances currently removed
//!
//! Recording is a no-op until a recorder is installed.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_poll() {
    counter!("sentinel_polls_total").increment(1);
}

pub fn record_feed_failure() {
    counter!("sentinel_feed_failures_total").increment(1);
}

pub fn record_decision(kind: &'static str) {
    counter!("sentinel_decisions_total", "kind" => kind).increment(1);
}

pub fn record_upstream_edit(action: &'static str, outcome: &'static str) {
    counter!("sentinel_upstream_edits_total", "action" => action, "outcome" => outcome).increment(1);
}

pub fn record_reload(outcome: &'static str) {
    counter!("sentinel_reloads_total", "outcome" => outcome).increment(1);
}

pub fn record_instances(tracked: usize, removed: usize) {
    gauge!("sentinel_instances_tracked").set(tracked as f64);
    gauge!("sentinel_instances_removed").set(removed as f64);
}
