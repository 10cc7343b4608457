//! In-memory stats store.

use std::sync::RwLock;

use async_trait::async_trait;
use inkcache_core::{CacheStats, StorageError, StorageResult};

use super::traits::StatsStore;

/// Stats record held in process memory. `None` until the first write.
#[derive(Debug, Default)]
pub struct InMemoryStatsStore {
    record: RwLock<Option<CacheStats>>,
}

impl InMemoryStatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a record has been written yet.
    pub fn is_initialized(&self) -> bool {
        self.record.read().map(|r| r.is_some()).unwrap_or(false)
    }

    fn update(&self, apply: impl FnOnce(&mut CacheStats)) -> StorageResult<()> {
        let mut guard = self.record.write().map_err(|_| StorageError::LockPoisoned)?;
        let stats = guard.get_or_insert_with(CacheStats::fresh);
        apply(stats);
        Ok(())
    }
}

#[async_trait]
impl StatsStore for InMemoryStatsStore {
    async fn read(&self) -> StorageResult<CacheStats> {
        let guard = self.record.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(guard.clone().unwrap_or_else(CacheStats::fresh))
    }

    async fn record_hit(&self) -> StorageResult<()> {
        self.update(CacheStats::increment_hits)
    }

    async fn record_miss(&self) -> StorageResult<()> {
        self.update(CacheStats::increment_misses)
    }

    async fn reset(&self) -> StorageResult<CacheStats> {
        let fresh = CacheStats::fresh();
        let mut guard = self.record.write().map_err(|_| StorageError::LockPoisoned)?;
        *guard = Some(fresh.clone());
        Ok(fresh)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
