//! INKCACHE Render - Renderer Abstraction
//!
//! The pipeline treats rendering as an opaque function from diagram source
//! and theme to image markup. This crate defines that seam, the markup
//! well-formedness check, a timeout wrapper, and the adapter for a remote
//! headless-browser service.

use std::sync::Arc;

use async_trait::async_trait;
use inkcache_core::{MalformedOutput, RenderError, Theme, SVG_MARKUP_PREFIX};

pub mod remote;
pub mod timeout;

pub use remote::RemoteBrowserRenderer;
pub use timeout::TimeoutRenderer;

/// Maximum number of characters of rejected output kept for diagnostics.
const MALFORMED_PREFIX_CHARS: usize = 64;

// ============================================================================
// RENDERER TRAIT
// ============================================================================

/// Turns diagram source into image markup.
///
/// Implementations must be thread-safe (Send + Sync). Failures are reported
/// as [`RenderError`]; whether the returned markup is usable is decided by
/// the caller with [`validate_markup`].
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render `source` using `theme`.
    ///
    /// # Returns
    /// * `Ok(String)` - Markup as produced by the renderer, unchecked
    /// * `Err(RenderError)` - Launch, evaluation or timeout failure
    async fn render(&self, source: &str, theme: Theme) -> Result<String, RenderError>;

    /// Short name for logs and metrics.
    fn name(&self) -> &str;
}

#[async_trait]
impl<R: Renderer + ?Sized> Renderer for Arc<R> {
    async fn render(&self, source: &str, theme: Theme) -> Result<String, RenderError> {
        (**self).render(source, theme).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

// ============================================================================
// MARKUP CHECK
// ============================================================================

/// Minimal well-formedness check: the document must begin with `<svg`.
///
/// No whitespace is trimmed; a renderer that emits a leading XML prolog or
/// blank line is rejected.
pub fn validate_markup(markup: &str) -> Result<(), MalformedOutput> {
    if markup.starts_with(SVG_MARKUP_PREFIX) {
        return Ok(());
    }
    Err(MalformedOutput {
        prefix: markup.chars().take(MALFORMED_PREFIX_CHARS).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    struct EchoRenderer;

    #[async_trait]
    impl Renderer for EchoRenderer {
        async fn render(&self, source: &str, theme: Theme) -> Result<String, RenderError> {
            Ok(format!("<svg data-theme=\"{}\">{}</svg>", theme, source))
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[test]
    fn test_validate_markup_accepts_svg() {
        assert!(validate_markup("<svg xmlns=\"http://www.w3.org/2000/svg\"></svg>").is_ok());
    }

    #[test]
    fn test_validate_markup_rejects_html() {
        let err = validate_markup("<html><body>error</body></html>").unwrap_err();
        assert_eq!(err.prefix, "<html><body>error</body></html>");
    }

    #[test]
    fn test_validate_markup_rejects_leading_whitespace() {
        assert!(validate_markup("  <svg></svg>").is_err());
        assert!(validate_markup("").is_err());
    }

    #[test]
    fn test_malformed_prefix_is_truncated() {
        let long = "x".repeat(500);
        let err = validate_markup(&long).unwrap_err();
        assert_eq!(err.prefix.chars().count(), MALFORMED_PREFIX_CHARS);
    }

    #[tokio::test]
    async fn test_arc_dyn_renderer_delegates() {
        let renderer: Arc<dyn Renderer> = Arc::new(EchoRenderer);
        let markup = renderer.render("graph TD", Theme::Dark).await.unwrap();
        assert_eq!(markup, "<svg data-theme=\"dark\">graph TD</svg>");
        assert_eq!(renderer.name(), "echo");
    }

    proptest! {
        #[test]
        fn prop_svg_prefixed_markup_is_valid(body in "\\PC{0,200}") {
            let markup = format!("<svg{}", body);
            prop_assert!(validate_markup(&markup).is_ok());
        }

        #[test]
        fn prop_prefix_never_exceeds_limit(body in "[a-z<> ]{0,300}") {
            if let Err(err) = validate_markup(&body) {
                prop_assert!(err.prefix.chars().count() <= MALFORMED_PREFIX_CHARS);
                prop_assert!(body.starts_with(&err.prefix));
            }
        }
    }
}
