//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use inkcache_render::Renderer;
use inkcache_storage::{CacheStore, StatsStore};

use crate::jobs::BackgroundWriter;
use crate::pipeline::RenderPipeline;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Render pipeline for `/svg`.
    pub pipeline: Arc<RenderPipeline>,
    /// Cache store, for the entry listing.
    pub cache: Arc<dyn CacheStore>,
    /// Stats store, for the stats view, reset and readiness.
    pub stats: Arc<dyn StatsStore>,
    /// Maximum entries listed by `/cache-entries`.
    pub entry_listing_limit: usize,
    pub start_time: Instant,
}

impl AppState {
    /// Wire the pipeline to `cache`, `stats` and `renderer` through `writer`.
    pub fn new(
        cache: Arc<dyn CacheStore>,
        stats: Arc<dyn StatsStore>,
        renderer: Arc<dyn Renderer>,
        writer: BackgroundWriter,
        render_timeout: Duration,
        max_age: Duration,
        entry_listing_limit: usize,
    ) -> Self {
        let pipeline = Arc::new(RenderPipeline::new(
            Arc::clone(&cache),
            renderer,
            writer,
            render_timeout,
            max_age,
        ));
        Self {
            pipeline,
            cache,
            stats,
            entry_listing_limit,
            start_time: Instant::now(),
        }
    }

    /// Handle to the background writer behind the pipeline.
    pub fn writer(&self) -> &BackgroundWriter {
        self.pipeline.writer()
    }
}

crate::impl_from_ref!(Arc<RenderPipeline>, pipeline);
crate::impl_from_ref!(Arc<dyn CacheStore>, cache);
crate::impl_from_ref!(Arc<dyn StatsStore>, stats);
