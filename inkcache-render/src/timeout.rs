//! Deadline wrapper around any renderer.

use std::time::Duration;

use async_trait::async_trait;
use inkcache_core::{RenderError, Theme};

use crate::Renderer;

/// Bounds every render call of the inner renderer by `limit`.
///
/// When the deadline passes the inner future is dropped. The remote
/// renderer's session task keeps running until it has closed its session.
#[derive(Debug, Clone)]
pub struct TimeoutRenderer<R> {
    inner: R,
    limit: Duration,
}

impl<R: Renderer> TimeoutRenderer<R> {
    pub fn new(inner: R, limit: Duration) -> Self {
        Self { inner, limit }
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

#[async_trait]
impl<R: Renderer> Renderer for TimeoutRenderer<R> {
    async fn render(&self, source: &str, theme: Theme) -> Result<String, RenderError> {
        match tokio::time::timeout(self.limit, self.inner.render(source, theme)).await {
            Ok(result) => result,
            Err(_) => Err(RenderError::Timeout { after: self.limit }),
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
