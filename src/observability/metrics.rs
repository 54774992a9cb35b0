//! Metrics collection and exposition.
//!
//! # Metrics
//! - `fabric_polls_total` (counter): poll passes by outcome
//! - `fabric_poll_duration_seconds` (histogram): wall time of one pass
//! - `fabric_cluster_calls_total` (counter): cluster calls by outcome
//! - `fabric_services_skipped_total` (counter): services dropped from a pass, by reason
//! - `fabric_routers`, `fabric_services` (gauges): objects in the last document
//! - `fabric_passthrough_requests_total` (counter): passthrough responses by status
//!
//! Recording is a no-op until `init_metrics` installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Outcome label is `ok` or a `ClusterError::kind`.
pub fn record_cluster_call(outcome: &str) {
    counter!("fabric_cluster_calls_total", "outcome" => outcome.to_string()).increment(1);
}

pub fn record_poll(outcome: &'static str, started: Instant) {
    counter!("fabric_polls_total", "outcome" => outcome).increment(1);
    histogram!("fabric_poll_duration_seconds").record(started.elapsed().as_secs_f64());
}

pub fn record_service_skipped(reason: &'static str) {
    counter!("fabric_services_skipped_total", "reason" => reason).increment(1);
}

pub fn record_document(routers: usize, services: usize) {
    gauge!("fabric_routers").set(routers as f64);
    gauge!("fabric_services").set(services as f64);
}

pub fn record_passthrough(status: u16) {
    counter!("fabric_passthrough_requests_total", "status" => status.to_string()).increment(1);
}
