//! Stats store trait.

use async_trait::async_trait;
use inkcache_core::{CacheStats, StorageResult};

/// Durable hit/miss counter record.
///
/// One shared record, independent of the cache store. Implementations
/// decide how increments are made safe; callers may additionally serialize
/// them (see the background writer in `inkcache-api`).
#[async_trait]
pub trait StatsStore: Send + Sync {
    /// Current counters. A store with no record yet returns zeroed counters
    /// stamped with the current time, without persisting them.
    async fn read(&self) -> StorageResult<CacheStats>;

    /// Increment the hit counter by one.
    async fn record_hit(&self) -> StorageResult<()>;

    /// Increment the miss counter by one.
    async fn record_miss(&self) -> StorageResult<()>;

    /// Unconditionally replace the record with zeroed counters stamped now.
    /// Returns the new record.
    async fn reset(&self) -> StorageResult<CacheStats>;

    /// Backend name for logs and health output.
    fn backend_name(&self) -> &'static str;
}
