//! Metrics collection and exposition.
//!
//! # Metrics
//! - `aproxy_requests_total` (counter): proxied requests by proxy, status
//! - `aproxy_request_duration_seconds` (histogram): dispatch latency by proxy
//! - `aproxy_upstream_errors_total` (counter): peer transport failures by proxy, peer
//! - `aproxy_store_operations_total` (counter): topology loads/saves by op, outcome
//! - `aproxy_live_instances` (gauge): running proxy instances

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(proxy: &str, status: u16, elapsed: Duration) {
    counter!(
        "aproxy_requests_total",
        "proxy" => proxy.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("aproxy_request_duration_seconds", "proxy" => proxy.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_upstream_error(proxy: &str, peer: &str) {
    counter!(
        "aproxy_upstream_errors_total",
        "proxy" => proxy.to_string(),
        "peer" => peer.to_string()
    )
    .increment(1);
}

pub fn record_store_operation(op: &'static str, outcome: &'static str) {
    counter!("aproxy_store_operations_total", "op" => op, "outcome" => outcome).increment(1);
}

pub fn record_live_instances(count: usize) {
    gauge!("aproxy_live_instances").set(count as f64);
}
