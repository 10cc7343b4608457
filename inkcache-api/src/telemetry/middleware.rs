//! Per-request span, metrics and completion log.
//!
//! A `traceparent` header on the request becomes the parent of the span,
//! so renders show up under the caller's trace.

use axum::{
    extract::{MatchedPath, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use opentelemetry::{global, Context};
use opentelemetry_http::HeaderExtractor;
use std::time::Instant;
use tracing::{info_span, Instrument};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::metrics::with_metrics;

/// Route label used for requests that matched no route.
const UNMATCHED_ROUTE: &str = "unmatched";

fn extract_trace_context(headers: &HeaderMap) -> Context {
    global::get_text_map_propagator(|propagator| propagator.extract(&HeaderExtractor(headers)))
}

/// Route template for metrics and spans.
///
/// Uses the matched route rather than the raw path so query strings and
/// unknown paths cannot blow up Prometheus label cardinality.
fn route_label(matched: Option<&MatchedPath>) -> String {
    matched
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string())
}

/// Wraps every request, including 404s from the fallback.
pub async fn observability_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let route = route_label(request.extensions().get::<MatchedPath>());

    let parent_context = extract_trace_context(request.headers());

    let span = info_span!(
        "http_request",
        otel.name = %format!("{} {}", method, route),
        otel.kind = "server",
        http.method = %method,
        http.target = %path,
        http.route = %route,
        http.status_code = tracing::field::Empty,
    );
    // No-op when no OpenTelemetry layer is installed.
    let _ = span.set_parent(parent_context);

    let response = next.run(request).instrument(span.clone()).await;

    let duration = start.elapsed();
    let status = response.status();

    with_metrics(|m| {
        m.record_http_request(method.as_str(), &route, status.as_u16(), duration.as_secs_f64())
    });

    span.record("http.status_code", status.as_u16());

    tracing::info!(
        method = %method,
        path = %path,
        status = status.as_u16(),
        duration_ms = duration.as_millis() as u64,
        "Request completed"
    );

    response
}
