//! Prometheus counters and histograms for requests, cache lookups, renders
//! and background writes, served in text format on `/metrics`.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram, register_histogram_vec, CounterVec, Encoder,
    Histogram, HistogramVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// Request latency buckets in seconds. Cache hits land in the first few.
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Render latency buckets (seconds). Browser renders are slow.
const RENDER_LATENCY_BUCKETS: &[f64] = &[0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

/// Registered on first use. Registration failure disables recording.
pub static METRICS: Lazy<ApiResult<InkcacheMetrics>> = Lazy::new(InkcacheMetrics::new);

/// Container for all INKCACHE metrics.
#[derive(Clone)]
pub struct InkcacheMetrics {
    /// labels: method, path (route template), status
    pub http_requests_total: CounterVec,

    /// labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Cache lookup counter - labels: result (hit/miss/error)
    pub cache_lookups_total: CounterVec,

    /// Render counter - labels: outcome (success/failed/timeout/malformed)
    pub renders_total: CounterVec,

    /// Render duration histogram
    pub render_duration_seconds: Histogram,

    /// Background write counter - labels: job, status
    pub background_jobs_total: CounterVec,
}

impl InkcacheMetrics {
    /// Register every metric with the default registry.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "inkcache_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register http_requests_total: {}", e)))?,

            http_request_duration_seconds: register_histogram_vec!(
                "inkcache_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register http_request_duration_seconds: {}", e)))?,

            cache_lookups_total: register_counter_vec!(
                "inkcache_cache_lookups_total",
                "Total number of cache lookups by result",
                &["result"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register cache_lookups_total: {}", e)))?,

            renders_total: register_counter_vec!(
                "inkcache_renders_total",
                "Total number of render attempts by outcome",
                &["outcome"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register renders_total: {}", e)))?,

            render_duration_seconds: register_histogram!(
                "inkcache_render_duration_seconds",
                "Render duration in seconds",
                RENDER_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register render_duration_seconds: {}", e)))?,

            background_jobs_total: register_counter_vec!(
                "inkcache_background_jobs_total",
                "Total background write jobs by kind and status",
                &["job", "status"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register background_jobs_total: {}", e)))?,
        })
    }

    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Record a cache lookup result.
    pub fn record_lookup(&self, result: &str) {
        self.cache_lookups_total.with_label_values(&[result]).inc();
    }

    /// Record a render attempt.
    pub fn record_render(&self, outcome: &str, duration_secs: f64) {
        self.renders_total.with_label_values(&[outcome]).inc();
        self.render_duration_seconds.observe(duration_secs);
    }

    /// Record a background write job.
    pub fn record_background_job(&self, job: &str, success: bool) {
        let status = if success { "success" } else { "error" };
        self.background_jobs_total
            .with_label_values(&[job, status])
            .inc();
    }
}

/// Run `f` against the global metrics if they registered successfully.
pub fn with_metrics(f: impl FnOnce(&InkcacheMetrics)) {
    if let Ok(metrics) = METRICS.as_ref() {
        f(metrics);
    }
}

/// GET /metrics
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::core::Collector;

    #[test]
    fn test_metrics_creation() -> Result<(), String> {
        let metrics = METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))?;
        assert!(!metrics.http_requests_total.desc().is_empty());
        Ok(())
    }

    #[test]
    fn test_record_lookup_and_render() -> Result<(), String> {
        let metrics = METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))?;
        let before = metrics.cache_lookups_total.with_label_values(&["hit"]).get();
        metrics.record_lookup("hit");
        assert!(metrics.cache_lookups_total.with_label_values(&["hit"]).get() >= before + 1.0);

        metrics.record_render("success", 0.42);
        metrics.record_background_job("store", true);
        metrics.record_http_request("GET", "/svg", 200, 0.015);
        Ok(())
    }
}
