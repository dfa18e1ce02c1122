//! Prometheus metrics exposition
//!
//! Metric names:
//! - `api_requests_total` (counter): labels `status`, `method`
//! - `api_request_duration_seconds` (histogram): label `status`
//! - `token_refreshes_total` (counter): label `outcome`
//! - `upstream_errors_total` (counter): label `status`

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// Configures `api_request_duration_seconds` with explicit buckets so it
/// renders as a Prometheus histogram (with `_bucket` lines usable by
/// `histogram_quantile()`) rather than the default summary.
pub fn install_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full(
                "api_request_duration_seconds".to_string(),
            ),
            &[
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
            ],
        )
        .expect("failed to set histogram buckets")
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Record a completed request with status code and HTTP method labels.
pub fn record_request(status: u16, method: &str, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!("api_requests_total", "status" => status_str.clone(), "method" => method.to_string())
        .increment(1);
    metrics::histogram!("api_request_duration_seconds", "status" => status_str)
        .record(duration_secs);
}

/// Record a gate-triggered token refresh with its outcome ("ok" or "error").
pub fn record_token_refresh(outcome: &str) {
    metrics::counter!("token_refreshes_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record a non-2xx answer from the upstream platform API.
pub fn record_upstream_error(status: u16) {
    metrics::counter!("upstream_errors_total", "status" => status.to_string()).increment(1);
}
