//! Diagram rendering endpoint.
//!
//! `/svg` answers every method. The path and query exactly as received are
//! the cache key, so the handler reads the original URI rather than the
//! (possibly nested) routed one.

use std::sync::Arc;

use axum::{
    extract::{OriginalUri, State},
    http::{header, HeaderName, Method, StatusCode},
    response::{IntoResponse, Response},
};

use crate::constants::CACHE_STATUS_HEADER;
use crate::error::ApiResult;
use crate::pipeline::{RenderPipeline, RenderRequest};

/// ANY /svg?mermaid=<encoded>&theme=<default|dark>
pub async fn render_svg(
    State(pipeline): State<Arc<RenderPipeline>>,
    method: Method,
    OriginalUri(uri): OriginalUri,
) -> ApiResult<Response> {
    let raw_url = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());

    let request = RenderRequest::new(raw_url, method.as_str());
    let rendered = pipeline.handle(&request).await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, rendered.content_type),
            (header::CACHE_CONTROL, rendered.cache_control),
            (
                HeaderName::from_static(CACHE_STATUS_HEADER),
                rendered.cache_status.as_str().to_string(),
            ),
        ],
        rendered.body,
    )
        .into_response())
}
