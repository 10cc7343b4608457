//! Render Pipeline
//!
//! Per request: decode, look the canonical URL up in the cache, and on a
//! miss render, validate and hand the result to the background writer.
//!
//! Side effects are ordered. Nothing is counted for a request that fails to
//! decode. A miss is recorded before the renderer is invoked, so a render
//! that fails or never returns is still counted as demand.

use std::sync::Arc;
use std::time::{Duration, Instant};

use inkcache_core::{
    decode, CacheEntry, CacheKey, DecodeError, MalformedOutput, RenderError,
};
use inkcache_render::{validate_markup, Renderer, TimeoutRenderer};
use inkcache_storage::CacheStore;

use crate::jobs::BackgroundWriter;
use crate::telemetry::with_metrics;

// ============================================================================
// TYPES
// ============================================================================

/// An incoming render request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    /// Path and query exactly as received. This is the cache key.
    pub raw_url: String,
    /// HTTP method, recorded on the cache entry.
    pub method: String,
}

impl RenderRequest {
    pub fn new(raw_url: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            raw_url: raw_url.into(),
            method: method.into(),
        }
    }
}

/// Whether a response came from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// A complete image response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedResponse {
    pub body: Vec<u8>,
    pub content_type: String,
    pub cache_control: String,
    pub cache_status: CacheStatus,
}

impl RenderedResponse {
    fn from_entry(entry: &CacheEntry, cache_status: CacheStatus) -> Self {
        Self {
            body: entry.body.clone(),
            content_type: entry.content_type.clone(),
            cache_control: entry.cache_control(),
            cache_status,
        }
    }
}

/// Why a request produced no image.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    MalformedOutput(#[from] MalformedOutput),
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Cache-backed render pipeline.
pub struct RenderPipeline {
    cache: Arc<dyn CacheStore>,
    renderer: TimeoutRenderer<Arc<dyn Renderer>>,
    writer: BackgroundWriter,
    max_age: Duration,
}

impl RenderPipeline {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        renderer: Arc<dyn Renderer>,
        writer: BackgroundWriter,
        render_timeout: Duration,
        max_age: Duration,
    ) -> Self {
        Self {
            cache,
            renderer: TimeoutRenderer::new(renderer, render_timeout),
            writer,
            max_age,
        }
    }

    pub fn writer(&self) -> &BackgroundWriter {
        &self.writer
    }

    /// Serve one request.
    #[tracing::instrument(skip_all, fields(method = %request.method))]
    pub async fn handle(&self, request: &RenderRequest) -> Result<RenderedResponse, PipelineError> {
        let decoded = decode(&request.raw_url).map_err(|e| {
            tracing::debug!(error = %e, "Rejected undecodable request");
            e
        })?;

        let key = CacheKey::new(request.raw_url.as_str());
        let cached = match self.cache.lookup(&key).await {
            Ok(found) => found,
            Err(e) => {
                // Store failures degrade to a miss.
                tracing::warn!(error = %e, backend = self.cache.backend_name(), "Cache lookup failed");
                with_metrics(|m| m.record_lookup("error"));
                None
            }
        };

        if let Some(entry) = cached {
            with_metrics(|m| m.record_lookup("hit"));
            self.writer.record_hit();
            tracing::debug!(bytes = entry.body.len(), "Cache hit");
            return Ok(RenderedResponse::from_entry(&entry, CacheStatus::Hit));
        }

        with_metrics(|m| m.record_lookup("miss"));
        self.writer.record_miss();

        let started = Instant::now();
        let rendered = self
            .renderer
            .render(&decoded.diagram_source, decoded.theme)
            .await;
        let elapsed = started.elapsed().as_secs_f64();

        let markup = match rendered {
            Ok(markup) => markup,
            Err(e) => {
                let outcome = match e {
                    RenderError::Timeout { .. } => "timeout",
                    _ => "failed",
                };
                with_metrics(|m| m.record_render(outcome, elapsed));
                tracing::warn!(
                    error = %e,
                    renderer = self.renderer.name(),
                    theme = %decoded.theme,
                    "Render failed"
                );
                return Err(e.into());
            }
        };

        if let Err(e) = validate_markup(&markup) {
            with_metrics(|m| m.record_render("malformed", elapsed));
            tracing::warn!(prefix = %e.prefix, "Renderer returned malformed output");
            return Err(e.into());
        }
        with_metrics(|m| m.record_render("success", elapsed));

        let entry = CacheEntry::svg(markup.into_bytes(), request.method.as_str())
            .with_max_age(self.max_age);
        let response = RenderedResponse::from_entry(&entry, CacheStatus::Miss);
        self.writer.store(key, entry);

        tracing::debug!(
            bytes = response.body.len(),
            render_secs = elapsed,
            "Rendered and queued for caching"
        );
        Ok(response)
    }
}

impl std::fmt::Debug for RenderPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPipeline")
            .field("cache", &self.cache.backend_name())
            .field("renderer", &self.renderer.name())
            .field("render_timeout", &self.renderer.limit())
            .field("max_age", &self.max_age)
            .finish()
    }
}
