//! Lightweight metrics helpers for Portico.
//!
//! This module exposes convenience functions and RAII guards wrapping the
//! `metrics` crate macros, plus the Prometheus recorder installation whose
//! [`PrometheusHandle`] renders the scrape endpoint. The handle is created
//! once at startup and passed explicitly to the dispatch handler; library
//! code never installs a recorder on its own, so tests can substitute an
//! isolated one.
//!
//! Provided metrics (labels vary by family):
//! * `portico_requests_total` (counter: method, path, status)
//! * `portico_request_duration_seconds` (histogram: method, path)
//! * `portico_request_size_bytes` (histogram: method, path)
//! * `portico_response_size_bytes` (histogram: method, path)
//! * `portico_inflight_requests` (gauge)
//! * `portico_app_errors_total` (counter: path)
//!
//! The `path` label is always a registered route pattern (or one of the
//! gateway's own endpoints, or the `/*` bucket for unroutable paths), never
//! a raw request path, keeping label cardinality bounded.
use std::time::Duration;

use metrics::{Unit, counter, describe_counter, describe_gauge, describe_histogram, gauge,
    histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const PORTICO_REQUESTS_TOTAL: &str = "portico_requests_total";
pub const PORTICO_REQUEST_DURATION_SECONDS: &str = "portico_request_duration_seconds";
pub const PORTICO_REQUEST_SIZE_BYTES: &str = "portico_request_size_bytes";
pub const PORTICO_RESPONSE_SIZE_BYTES: &str = "portico_response_size_bytes";
pub const PORTICO_INFLIGHT_REQUESTS: &str = "portico_inflight_requests";
pub const PORTICO_APP_ERRORS_TOTAL: &str = "portico_app_errors_total";

/// Metrics label used when no route matches, bounding label cardinality.
pub const UNROUTED_LABEL: &str = "/*";

/// Install the process-wide Prometheus recorder and return the handle used
/// to render the scrape endpoint.
pub fn install_recorder() -> eyre::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| eyre::eyre!("Failed to install Prometheus recorder: {e}"))?;
    describe_metrics();
    Ok(handle)
}

/// Register metric descriptions (idempotent).
pub fn describe_metrics() {
    describe_counter!(
        PORTICO_REQUESTS_TOTAL,
        Unit::Count,
        "Total number of HTTP requests processed by the gateway."
    );
    describe_histogram!(
        PORTICO_REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "Latency of HTTP requests processed by the gateway."
    );
    describe_histogram!(
        PORTICO_REQUEST_SIZE_BYTES,
        Unit::Bytes,
        "Size of inbound request bodies, from Content-Length when declared."
    );
    describe_histogram!(
        PORTICO_RESPONSE_SIZE_BYTES,
        Unit::Bytes,
        "Size of response bodies, from Content-Length when declared."
    );
    describe_gauge!(
        PORTICO_INFLIGHT_REQUESTS,
        "Number of requests currently being handled."
    );
    describe_counter!(
        PORTICO_APP_ERRORS_TOTAL,
        Unit::Count,
        "Number of requests that ended in a server-side (5xx) error."
    );
}

/// Increment the total request counter for a completed request.
pub fn increment_request_total(method: &str, path: &str, status: u16) {
    counter!(
        PORTICO_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a completed request's duration.
pub fn record_request_duration(method: &str, path: &str, duration: Duration) {
    histogram!(
        PORTICO_REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Observe a declared request body size.
pub fn observe_request_size(method: &str, path: &str, bytes: u64) {
    histogram!(
        PORTICO_REQUEST_SIZE_BYTES,
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(bytes as f64);
}

/// Observe a declared response body size.
pub fn observe_response_size(method: &str, path: &str, bytes: u64) {
    histogram!(
        PORTICO_RESPONSE_SIZE_BYTES,
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(bytes as f64);
}

/// Count a request that ended in a server-side error.
pub fn increment_app_error(path: &str) {
    counter!(PORTICO_APP_ERRORS_TOTAL, "path" => path.to_string()).increment(1);
}

/// RAII guard tracking the in-flight request gauge.
///
/// The gauge decrements on `Drop`, so early returns and panics inside the
/// pipeline cannot leak an in-flight slot.
pub struct InflightGuard(());

impl InflightGuard {
    pub fn enter() -> Self {
        gauge!(PORTICO_INFLIGHT_REQUESTS).increment(1.0);
        Self(())
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        gauge!(PORTICO_INFLIGHT_REQUESTS).decrement(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_metrics_is_idempotent() {
        describe_metrics();
        describe_metrics();
    }

    #[test]
    fn test_inflight_guard_balances() {
        let guard = InflightGuard::enter();
        // Gauge decrements when dropped
        drop(guard);
    }

    #[test]
    fn test_helpers_accept_route_labels() {
        increment_request_total("GET", "/admin/*", 200);
        record_request_duration("GET", "/admin/*", Duration::from_millis(3));
        observe_request_size("POST", "/loan/borrow", 128);
        observe_response_size("POST", "/loan/borrow", 512);
        increment_app_error(UNROUTED_LABEL);
    }
}
