//! Constants shared across INKCACHE crates.

// ============================================================================
// QUERY PARAMETERS
// ============================================================================

/// Query parameter carrying the compressed diagram source.
pub const PAYLOAD_PARAM: &str = "mermaid";

/// Query parameter selecting the diagram theme.
pub const THEME_PARAM: &str = "theme";

// ============================================================================
// RENDERED ARTIFACTS
// ============================================================================

/// Content type of rendered diagrams.
pub const SVG_CONTENT_TYPE: &str = "image/svg+xml";

/// Every well-formed rendered artifact starts with this tag.
pub const SVG_MARKUP_PREFIX: &str = "<svg";

/// Freshness lifetime of rendered artifacts: one year.
pub const DEFAULT_MAX_AGE_SECS: u64 = 31_536_000;

// ============================================================================
// DEBUG ENDPOINTS
// ============================================================================

/// Maximum number of keys returned by the cache entry listing.
pub const DEFAULT_ENTRY_LISTING_LIMIT: usize = 50;
