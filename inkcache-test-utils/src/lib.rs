//! INKCACHE Test Utilities
//!
//! Centralized test infrastructure for the INKCACHE workspace:
//! - Scripted renderers standing in for the remote browser
//! - URL fixtures built with the real payload encoder
//! - Proptest generators for diagrams, themes and cache entries

pub use inkcache_core::{
    decode, encode, CacheEntry, CacheKey, CacheStats, DecodeError, MalformedOutput, RenderError,
    Theme,
};
pub use inkcache_render::Renderer;

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// MOCK RENDERERS
// ============================================================================

/// Deterministic renderer: wraps the source and theme in an `<svg>` element.
///
/// Counts calls and remembers the last source so tests can assert that a
/// cache hit never reached the renderer.
#[derive(Debug, Default)]
pub struct ScriptedRenderer {
    calls: AtomicUsize,
    last_source: Mutex<Option<String>>,
    delay: Option<Duration>,
}

impl ScriptedRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `delay` before answering.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_source(&self) -> Option<String> {
        self.last_source.lock().ok().and_then(|s| s.clone())
    }

    /// The markup this renderer produces for `source` and `theme`.
    pub fn markup_for(source: &str, theme: Theme) -> String {
        let escaped = source
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;");
        format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" data-theme=\"{}\"><text>{}</text></svg>",
            theme, escaped
        )
    }
}

#[async_trait]
impl Renderer for ScriptedRenderer {
    async fn render(&self, source: &str, theme: Theme) -> Result<String, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_source.lock() {
            *last = Some(source.to_string());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(Self::markup_for(source, theme))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Renderer that always fails with the configured error.
#[derive(Debug)]
pub struct FailingRenderer {
    error: RenderError,
    calls: AtomicUsize,
}

impl FailingRenderer {
    pub fn new(error: RenderError) -> Self {
        Self {
            error,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fails as if the browser could not be started.
    pub fn launch_failure() -> Self {
        Self::new(RenderError::LaunchFailure {
            reason: "browser session refused".to_string(),
        })
    }

    /// Fails as if the diagram threw during evaluation.
    pub fn evaluation_failure() -> Self {
        Self::new(RenderError::EvaluationFailure {
            reason: "Parse error on line 1".to_string(),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Renderer for FailingRenderer {
    async fn render(&self, _source: &str, _theme: Theme) -> Result<String, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Renderer that succeeds with output that is not an SVG document.
#[derive(Debug, Clone)]
pub struct MalformedRenderer {
    output: String,
}

impl MalformedRenderer {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
        }
    }
}

impl Default for MalformedRenderer {
    fn default() -> Self {
        Self::new("<html><body>Syntax error in graph</body></html>")
    }
}

#[async_trait]
impl Renderer for MalformedRenderer {
    async fn render(&self, _source: &str, _theme: Theme) -> Result<String, RenderError> {
        Ok(self.output.clone())
    }

    fn name(&self) -> &str {
        "malformed"
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

/// Build a `/svg` request URL for `source`, optionally with a theme.
pub fn encode_url(source: &str, theme: Option<&str>) -> String {
    match theme {
        Some(theme) => format!("/svg?mermaid={}&theme={}", encode(source), theme),
        None => format!("/svg?mermaid={}", encode(source)),
    }
}

/// A small flowchart used across test suites.
pub const SAMPLE_FLOWCHART: &str = "graph TD;\n    A[Start] --> B{Cached?};\n    B -- yes --> C[Serve];\n    B -- no --> D[Render];";

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    /// Generate diagram-like source text, including non-ASCII labels.
    pub fn arb_diagram_source() -> impl Strategy<Value = String> {
        prop_oneof![
            "graph (TD|LR);( [A-Z]-->[A-Z];){1,8}",
            "sequenceDiagram\n( [A-Z][a-z]{0,6}->>[A-Z][a-z]{0,6}: [a-z ]{1,20}\n){1,5}",
            "\\PC{1,200}",
        ]
    }

    /// Generate a raw theme query value, including junk.
    pub fn arb_theme_param() -> impl Strategy<Value = Option<String>> {
        prop_oneof![
            Just(None),
            Just(Some("dark".to_string())),
            Just(Some("default".to_string())),
            "[a-zA-Z]{0,10}".prop_map(Some),
        ]
    }

    /// Generate a fresh SVG cache entry: written up to an hour ago with at
    /// least an hour of lifetime left.
    pub fn arb_cache_entry() -> impl Strategy<Value = CacheEntry> {
        (
            "[a-z0-9 ]{0,200}",
            7_200u64..31_536_000,
            0i64..3_600,
            prop_oneof![Just("GET"), Just("HEAD"), Just("POST")],
        )
            .prop_map(|(body, max_age, age_secs, method)| {
                let stored_at = Utc::now() - chrono::Duration::seconds(age_secs);
                CacheEntry::svg(format!("<svg>{}</svg>", body), method)
                    .with_max_age(Duration::from_secs(max_age))
                    .with_stored_at(stored_at)
            })
    }
}
