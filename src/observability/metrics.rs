//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): proxied requests by method, status
//! - `proxy_request_duration_seconds` (histogram): end-to-end latency
//! - `proxy_signature_failures_total` (counter): rejections by reason
//! - `proxy_backend_resolve_total` (counter): link resolutions by outcome
//! - `proxy_redirect_hops` (histogram): hops followed per download
//! - `proxy_self_loop_total` (counter): in-process self-loop re-entries
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("proxy_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_signature_failure(reason: &'static str) {
    metrics::counter!("proxy_signature_failures_total", "reason" => reason).increment(1);
}

pub fn record_backend_resolve(outcome: &'static str) {
    metrics::counter!("proxy_backend_resolve_total", "outcome" => outcome).increment(1);
}

pub fn record_redirect_hops(hops: usize) {
    metrics::histogram!("proxy_redirect_hops").record(hops as f64);
}

pub fn record_self_loop() {
    metrics::counter!("proxy_self_loop_total").increment(1);
}
