//! Metrics collection and exposition.
//!
//! # Metrics
//! - `web_provisioning_total` (counter): provisioning attempts by backend, outcome
//! - `web_resource_releases_total` (counter): teardown releases by backend, outcome
//! - `web_http_requests_total` (counter): requests by method, status
//! - `web_http_request_duration_seconds` (histogram): latency distribution

use std::net::SocketAddr;
use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::resources::{BackendKind, ReleaseOutcome};

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_provisioning(backend: BackendKind, success: bool) {
    ::metrics::counter!(
        "web_provisioning_total",
        "backend" => backend.as_str(),
        "outcome" => if success { "success" } else { "failure" }
    )
    .increment(1);
}

pub fn record_release(backend: BackendKind, outcome: &ReleaseOutcome) {
    ::metrics::counter!(
        "web_resource_releases_total",
        "backend" => backend.as_str(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    ::metrics::counter!(
        "web_http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!(
        "web_http_request_duration_seconds",
        "method" => method.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Middleware recording request count and latency.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    let response = next.run(request).await;

    record_request(&method, response.status().as_u16(), start);
    response
}
