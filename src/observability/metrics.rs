//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mirror_requests_total` (counter): proxied requests by method, status, cache outcome
//! - `mirror_request_duration_seconds` (histogram): end-to-end proxy latency
//! - `mirror_upstream_duration_seconds` (histogram): upstream fetch latency
//! - `mirror_cache_write_failures_total` (counter)
//! - `mirror_cache_cleared_entries_total` (counter)
//! - `mirror_webhook_deliveries_total` (counter): by result
//! - `mirror_deployments_total` (counter): by final state and pull result

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram, Label};
use metrics_exporter_prometheus::PrometheusBuilder;

/// How a proxied request was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Miss,
    Bypass,
    Error,
}

impl CacheOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheOutcome::Hit => "hit",
            CacheOutcome::Miss => "miss",
            CacheOutcome::Bypass => "bypass",
            CacheOutcome::Error => "error",
        }
    }
}

/// Start the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, outcome: CacheOutcome, start: Instant) {
    let labels = vec![
        Label::new("method", method.to_string()),
        Label::new("status", status.to_string()),
        Label::new("cache", outcome.as_str()),
    ];
    counter!("mirror_requests_total", labels.clone()).increment(1);
    histogram!("mirror_request_duration_seconds", labels).record(start.elapsed().as_secs_f64());
}

pub fn record_upstream(status: Option<u16>, start: Instant) {
    let status = status.map_or_else(|| "none".to_string(), |s| s.to_string());
    histogram!("mirror_upstream_duration_seconds", "status" => status)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_cache_write_failure() {
    counter!("mirror_cache_write_failures_total").increment(1);
}

pub fn record_cache_cleared(entries: usize) {
    counter!("mirror_cache_cleared_entries_total").increment(entries as u64);
}

pub fn record_webhook(result: &'static str) {
    counter!("mirror_webhook_deliveries_total", "result" => result).increment(1);
}

pub fn record_deployment(state: &'static str, pull_success: Option<bool>) {
    let pull = match pull_success {
        Some(true) => "ok",
        Some(false) => "failed",
        None => "skipped",
    };
    counter!("mirror_deployments_total", "state" => state, "pull" => pull).increment(1);
}
