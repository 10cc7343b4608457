//! Constants for INKCACHE API
//!
//! Defaults for every environment-configurable setting live here.

// ============================================================================
// SERVER
// ============================================================================

/// Default bind host
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";

/// Default listen port
pub const DEFAULT_PORT: u16 = 3000;

/// Default bound on how long shutdown waits for queued writes (seconds)
pub const DEFAULT_SHUTDOWN_DRAIN_SECS: u64 = 10;

// ============================================================================
// RENDERING
// ============================================================================

/// Default remote browser service endpoint
pub const DEFAULT_RENDERER_URL: &str = "http://127.0.0.1:9222";

/// Default render timeout (seconds)
pub const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// STORAGE
// ============================================================================

/// Default directory for LMDB environments
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Default LMDB map size (megabytes)
pub const DEFAULT_LMDB_MAP_SIZE_MB: usize = 1024;

/// Default interval between expired-entry sweeps (seconds, 1 hour)
pub const DEFAULT_EXPIRY_SWEEP_SECS: u64 = 3600;

/// Subdirectory of the data dir holding the cache environment
pub const CACHE_SUBDIR: &str = "cache";

/// Subdirectory of the data dir holding the stats environment
pub const STATS_SUBDIR: &str = "stats";

// ============================================================================
// CORS
// ============================================================================

/// Default CORS max age in seconds (24 hours)
pub const DEFAULT_CORS_MAX_AGE_SECS: u64 = 86400;

// ============================================================================
// RESPONSES
// ============================================================================

/// Response header reporting whether `/svg` was served from cache
pub const CACHE_STATUS_HEADER: &str = "x-cache";

/// Confirmation message returned by the stats reset endpoint
pub const STATS_RESET_MESSAGE: &str = "Cache statistics reset";
