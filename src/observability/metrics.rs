//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, rejections, redactions)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by route, status
//! - `gateway_request_duration_seconds` (histogram): latency by route
//! - `gateway_upstream_duration_seconds` (histogram): adapter latency by provider
//! - `gateway_rate_limited_total` (counter): denials by policy
//! - `gateway_auth_rejections_total` (counter): rejections by reason
//! - `gateway_redactions_total` (counter): outbound payloads altered by the redactor
//! - `gateway_audit_sink_failures_total` (counter): failed audit emissions
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, which keeps tests free of global setup

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &str, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_call(provider: &str, start: Instant) {
    histogram!("gateway_upstream_duration_seconds", "provider" => provider.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(policy: &str) {
    counter!("gateway_rate_limited_total", "policy" => policy.to_string()).increment(1);
}

pub fn record_auth_rejection(reason: &'static str) {
    counter!("gateway_auth_rejections_total", "reason" => reason).increment(1);
}

pub fn record_redaction() {
    counter!("gateway_redactions_total").increment(1);
}

pub fn record_sink_failure(sink: &'static str) {
    counter!("gateway_audit_sink_failures_total", "sink" => sink).increment(1);
}
