//! Metrics collection and exposition.
//!
//! # Metrics
//! - `bundle_cache_hits_total` / `bundle_cache_misses_total` (counter, by path)
//! - `bundle_cache_entries` (gauge): current artifact count
//! - `bundle_generations_total` (counter, by outcome)
//! - `bundle_generation_duration_seconds` (histogram)
//! - `bundle_watch_invalidations_total` (counter, by path)

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on the given address. Failure is logged,
/// not fatal; recording into a void recorder is a no-op.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(error) => tracing::error!(%error, "Failed to install Prometheus exporter"),
    }
}

pub fn record_cache_hit(path: &str) {
    metrics::counter!("bundle_cache_hits_total", "path" => path.to_owned()).increment(1);
}

pub fn record_cache_miss(path: &str) {
    metrics::counter!("bundle_cache_misses_total", "path" => path.to_owned()).increment(1);
}

pub fn record_cache_size(entries: usize) {
    metrics::gauge!("bundle_cache_entries").set(entries as f64);
}

pub fn record_generation(outcome: &'static str, started: Instant) {
    metrics::counter!("bundle_generations_total", "outcome" => outcome).increment(1);
    metrics::histogram!("bundle_generation_duration_seconds")
        .record(started.elapsed().as_secs_f64());
}

pub fn record_invalidation(path: &str) {
    metrics::counter!("bundle_watch_invalidations_total", "path" => path.to_owned()).increment(1);
}
