//! Store construction from configuration.

use std::sync::Arc;

use inkcache_storage::{
    CacheStore, InMemoryCacheStore, InMemoryStatsStore, LmdbCacheStore, LmdbStatsStore,
    StatsStore,
};

use crate::config::{ApiConfig, StoreBackend};
use crate::constants::{CACHE_SUBDIR, STATS_SUBDIR};
use crate::error::{ApiError, ApiResult};

/// Cache and stats stores selected by `config.store_backend`.
pub fn open_stores(config: &ApiConfig) -> ApiResult<(Arc<dyn CacheStore>, Arc<dyn StatsStore>)> {
    match config.store_backend {
        StoreBackend::Memory => {
            tracing::info!("Using in-memory cache and stats stores");
            Ok((
                Arc::new(InMemoryCacheStore::new()),
                Arc::new(InMemoryStatsStore::new()),
            ))
        }
        StoreBackend::Lmdb => {
            let cache_dir = config.data_dir.join(CACHE_SUBDIR);
            let stats_dir = config.data_dir.join(STATS_SUBDIR);
            tracing::info!(
                cache_dir = %cache_dir.display(),
                stats_dir = %stats_dir.display(),
                map_size_mb = config.lmdb_map_size_mb,
                "Opening LMDB stores"
            );

            let cache = LmdbCacheStore::open(&cache_dir, config.lmdb_map_size_mb).map_err(|e| {
                ApiError::storage_error(format!("Failed to open cache store: {}", e))
            })?;
            let stats = LmdbStatsStore::open(&stats_dir, config.lmdb_map_size_mb).map_err(|e| {
                ApiError::storage_error(format!("Failed to open stats store: {}", e))
            })?;
            Ok((Arc::new(cache), Arc::new(stats)))
        }
    }
}
