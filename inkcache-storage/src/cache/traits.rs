//! Cache store trait.
//!
//! This module defines the trait that content cache backends implement.
//! The cache is keyed by the literal request URL and holds rendered
//! artifacts with their freshness metadata.

use async_trait::async_trait;
use inkcache_core::{CacheEntry, CacheKey, KeyListing, StorageResult, StoreOutcome};

/// Content cache backend.
///
/// This trait abstracts over different cache backends (in-memory, LMDB).
/// Implementations must be thread-safe and support concurrent access.
///
/// # Keys
///
/// Keys are canonical request URLs, compared byte for byte. Backends may
/// transform the key for physical storage (e.g. hashing) but must never
/// merge two distinct URLs into one entry.
///
/// # Freshness
///
/// Backends honor each entry's `max_age`: an expired entry is reported as
/// absent by [`lookup`](CacheStore::lookup) and excluded from listings.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a fresh entry for `key`, or `None`.
    async fn lookup(&self, key: &CacheKey) -> StorageResult<Option<CacheEntry>>;

    /// Store an entry for `key`.
    ///
    /// Writes are idempotent: if a fresh entry already exists it is kept
    /// and [`StoreOutcome::AlreadyPresent`] is returned.
    async fn store(&self, key: &CacheKey, entry: &CacheEntry) -> StorageResult<StoreOutcome>;

    /// Enumerate fresh keys without inspecting values.
    ///
    /// `count` covers every fresh key; `entries` holds at most `limit`.
    async fn list_keys(&self, limit: usize) -> StorageResult<KeyListing>;

    /// Delete every expired entry. Returns how many were removed.
    async fn purge_expired(&self) -> StorageResult<u64>;

    /// Number of fresh entries.
    async fn entry_count(&self) -> StorageResult<u64> {
        Ok(self.list_keys(0).await?.count)
    }

    /// Backend name for logs and health output.
    fn backend_name(&self) -> &'static str;
}
