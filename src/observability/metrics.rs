//! Metrics collection and exposition.
//!
//! # Metrics
//! - `portal_feature_registrations_total` (counter): registration attempts by feature, outcome
//! - `portal_requests_total` (counter): requests by method, route, status
//! - `portal_request_duration_seconds` (histogram): latency distribution
//!
//! # Design Decisions
//! - Labels use the matched route template, never the raw path
//! - Histogram buckets tuned for typical web latencies

use std::time::Instant;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::Request,
    middleware::Next,
    response::Response,
};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

const DURATION_METRIC: &str = "portal_request_duration_seconds";
const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

/// Install the global Prometheus recorder.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    builder()?.install_recorder()
}

/// A recorder handle that is not installed globally. Used by tests.
pub fn detached_handle() -> Result<PrometheusHandle, BuildError> {
    Ok(builder()?.build_recorder().handle())
}

fn builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(DURATION_METRIC.to_string()), LATENCY_BUCKETS)
}

pub fn record_registration(feature: &str, outcome: &str) {
    counter!(
        "portal_feature_registrations_total",
        "feature" => feature.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    counter!(
        "portal_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        DURATION_METRIC,
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Middleware recording request count and latency.
pub async fn track_requests(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;
    record_request(&method, response.status().as_u16(), &route, start);
    response
}
