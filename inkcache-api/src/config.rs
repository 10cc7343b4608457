//! API Configuration Module
//!
//! Configuration is loaded from environment variables with defaults that
//! run a single in-memory instance against a local browser service.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use inkcache_core::{ConfigError, DEFAULT_ENTRY_LISTING_LIMIT, DEFAULT_MAX_AGE_SECS};

use crate::constants::{
    DEFAULT_BIND_HOST, DEFAULT_DATA_DIR, DEFAULT_EXPIRY_SWEEP_SECS, DEFAULT_LMDB_MAP_SIZE_MB,
    DEFAULT_PORT, DEFAULT_RENDERER_URL, DEFAULT_RENDER_TIMEOUT_SECS, DEFAULT_SHUTDOWN_DRAIN_SECS,
};

// ============================================================================
// STORE BACKEND
// ============================================================================

/// Which implementation backs the cache and stats stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process memory; lost on restart.
    Memory,
    /// LMDB environments under the data directory.
    Lmdb,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "lmdb" => Ok(StoreBackend::Lmdb),
            other => Err(ConfigError::InvalidValue {
                field: "INKCACHE_STORE_BACKEND".to_string(),
                value: other.to_string(),
                reason: "expected 'memory' or 'lmdb'".to_string(),
            }),
        }
    }
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// Runtime configuration for the render service.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host part of the listen address.
    pub bind_host: String,

    /// Listen port.
    pub port: u16,

    /// Base URL of the remote browser service.
    pub renderer_url: String,

    /// Bearer token for the browser service, if it requires one.
    pub renderer_token: Option<String>,

    /// Deadline for one render call.
    pub render_timeout: Duration,

    /// Freshness lifetime written into cache entries and `Cache-Control`.
    pub cache_max_age: Duration,

    /// Cache and stats store implementation.
    pub store_backend: StoreBackend,

    /// Root directory for LMDB environments.
    pub data_dir: PathBuf,

    /// LMDB map size in megabytes, per environment.
    pub lmdb_map_size_mb: usize,

    /// Maximum entries returned by `/cache-entries`.
    pub entry_listing_limit: usize,

    /// How long shutdown waits for queued cache and stats writes.
    pub shutdown_drain: Duration,

    /// Interval between sweeps that delete expired cache entries.
    pub expiry_sweep_interval: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: DEFAULT_BIND_HOST.to_string(),
            port: DEFAULT_PORT,
            renderer_url: DEFAULT_RENDERER_URL.to_string(),
            renderer_token: None,
            render_timeout: Duration::from_secs(DEFAULT_RENDER_TIMEOUT_SECS),
            cache_max_age: Duration::from_secs(DEFAULT_MAX_AGE_SECS),
            store_backend: StoreBackend::Memory,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            lmdb_map_size_mb: DEFAULT_LMDB_MAP_SIZE_MB,
            entry_listing_limit: DEFAULT_ENTRY_LISTING_LIMIT,
            shutdown_drain: Duration::from_secs(DEFAULT_SHUTDOWN_DRAIN_SECS),
            expiry_sweep_interval: Duration::from_secs(DEFAULT_EXPIRY_SWEEP_SECS),
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `INKCACHE_API_BIND`: Listen host (default: 0.0.0.0)
    /// - `PORT` / `INKCACHE_API_PORT`: Listen port (default: 3000)
    /// - `INKCACHE_RENDERER_URL`: Browser service URL (default: http://127.0.0.1:9222)
    /// - `INKCACHE_RENDERER_TOKEN`: Browser service bearer token (default: unset)
    /// - `INKCACHE_RENDER_TIMEOUT_SECS`: Render deadline (default: 30)
    /// - `INKCACHE_CACHE_MAX_AGE_SECS`: Freshness lifetime (default: 31536000)
    /// - `INKCACHE_STORE_BACKEND`: "memory" or "lmdb" (default: memory)
    /// - `INKCACHE_DATA_DIR`: LMDB root directory (default: ./data)
    /// - `INKCACHE_LMDB_MAP_SIZE_MB`: LMDB map size (default: 1024)
    /// - `INKCACHE_ENTRY_LISTING_LIMIT`: `/cache-entries` cap (default: 50)
    /// - `INKCACHE_SHUTDOWN_DRAIN_SECS`: Write drain bound (default: 10)
    /// - `INKCACHE_EXPIRY_SWEEP_SECS`: Expired-entry sweep interval (default: 3600)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    ///
    /// Unparsable numbers fall back to their defaults; an unknown store
    /// backend is an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u64>().ok());

        let bind_host = lookup("INKCACHE_API_BIND").unwrap_or(defaults.bind_host);

        let port = lookup("PORT")
            .or_else(|| lookup("INKCACHE_API_PORT"))
            .and_then(|s| s.trim().parse::<u16>().ok())
            .unwrap_or(defaults.port);

        let renderer_url = lookup("INKCACHE_RENDERER_URL").unwrap_or(defaults.renderer_url);

        let renderer_token = lookup("INKCACHE_RENDERER_TOKEN").filter(|t| !t.is_empty());

        let render_timeout = parsed("INKCACHE_RENDER_TIMEOUT_SECS")
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.render_timeout);

        let cache_max_age = parsed("INKCACHE_CACHE_MAX_AGE_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.cache_max_age);

        let store_backend = match lookup("INKCACHE_STORE_BACKEND") {
            Some(value) => value.parse()?,
            None => defaults.store_backend,
        };

        let data_dir = lookup("INKCACHE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let lmdb_map_size_mb = parsed("INKCACHE_LMDB_MAP_SIZE_MB")
            .filter(|mb| *mb > 0)
            .map(|mb| mb as usize)
            .unwrap_or(defaults.lmdb_map_size_mb);

        let entry_listing_limit = parsed("INKCACHE_ENTRY_LISTING_LIMIT")
            .map(|n| n as usize)
            .unwrap_or(defaults.entry_listing_limit);

        let shutdown_drain = parsed("INKCACHE_SHUTDOWN_DRAIN_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.shutdown_drain);

        let expiry_sweep_interval = parsed("INKCACHE_EXPIRY_SWEEP_SECS")
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.expiry_sweep_interval);

        Ok(Self {
            bind_host,
            port,
            renderer_url,
            renderer_token,
            render_timeout,
            cache_max_age,
            store_backend,
            data_dir,
            lmdb_map_size_mb,
            entry_listing_limit,
            shutdown_drain,
            expiry_sweep_interval,
        })
    }

    /// The socket address to listen on.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue {
                field: "INKCACHE_API_BIND".to_string(),
                value: addr.clone(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.renderer_url, "http://127.0.0.1:9222");
        assert_eq!(config.render_timeout, Duration::from_secs(30));
        assert_eq!(config.cache_max_age, Duration::from_secs(31_536_000));
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.entry_listing_limit, 50);
        assert_eq!(config.expiry_sweep_interval, Duration::from_secs(3600));
        assert!(config.renderer_token.is_none());
        assert_eq!(config.bind_addr().unwrap().to_string(), "0.0.0.0:3000");
    }

    #[test]
    fn test_port_precedence() {
        let config = config_from(&[("PORT", "8080"), ("INKCACHE_API_PORT", "9090")]).unwrap();
        assert_eq!(config.port, 8080);

        let config = config_from(&[("INKCACHE_API_PORT", "9090")]).unwrap();
        assert_eq!(config.port, 9090);
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = config_from(&[
            ("PORT", "not-a-port"),
            ("INKCACHE_RENDER_TIMEOUT_SECS", "0"),
            ("INKCACHE_ENTRY_LISTING_LIMIT", "-5"),
        ])
        .unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.render_timeout, Duration::from_secs(30));
        assert_eq!(config.entry_listing_limit, 50);
    }

    #[test]
    fn test_expiry_sweep_interval() {
        let config = config_from(&[("INKCACHE_EXPIRY_SWEEP_SECS", "120")]).unwrap();
        assert_eq!(config.expiry_sweep_interval, Duration::from_secs(120));

        let config = config_from(&[("INKCACHE_EXPIRY_SWEEP_SECS", "0")]).unwrap();
        assert_eq!(config.expiry_sweep_interval, Duration::from_secs(3600));
    }

    #[test]
    fn test_store_backend_parsing() {
        let config = config_from(&[
            ("INKCACHE_STORE_BACKEND", "LMDB"),
            ("INKCACHE_DATA_DIR", "/var/lib/inkcache"),
        ])
        .unwrap();
        assert_eq!(config.store_backend, StoreBackend::Lmdb);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/inkcache"));

        let err = config_from(&[("INKCACHE_STORE_BACKEND", "redis")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_empty_token_is_unset() {
        let config = config_from(&[("INKCACHE_RENDERER_TOKEN", "")]).unwrap();
        assert!(config.renderer_token.is_none());

        let config = config_from(&[("INKCACHE_RENDERER_TOKEN", "abc")]).unwrap();
        assert_eq!(config.renderer_token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_invalid_bind_host() {
        let config = config_from(&[("INKCACHE_API_BIND", "not a host")]).unwrap();
        assert!(config.bind_addr().is_err());
    }
}
