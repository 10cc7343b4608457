//! In-memory cache store.
//!
//! A `DashMap` keyed by canonical URL with per-entry expiry. Used for
//! development, tests, and single-node deployments where the cache does not
//! need to survive restarts.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use inkcache_core::{CacheEntry, CacheKey, KeyListing, ListedKey, StorageResult, StoreOutcome};

use super::traits::CacheStore;

struct Slot {
    entry: CacheEntry,
    /// Insertion order, used to make listings stable.
    seq: u64,
}

/// Thread-safe in-memory cache with per-entry freshness.
#[derive(Default)]
pub struct InMemoryCacheStore {
    entries: DashMap<CacheKey, Slot>,
    next_seq: AtomicU64,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn lookup(&self, key: &CacheKey) -> StorageResult<Option<CacheEntry>> {
        if let Some(slot) = self.entries.get(key) {
            if slot.entry.is_fresh() {
                return Ok(Some(slot.entry.clone()));
            }
            // Expired, remove it
            drop(slot);
            self.entries
                .remove_if(key, |_, slot| !slot.entry.is_fresh());
        }
        Ok(None)
    }

    async fn store(&self, key: &CacheKey, entry: &CacheEntry) -> StorageResult<StoreOutcome> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        match self.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().entry.is_fresh() {
                    return Ok(StoreOutcome::AlreadyPresent);
                }
                occupied.insert(Slot {
                    entry: entry.clone(),
                    seq,
                });
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Slot {
                    entry: entry.clone(),
                    seq,
                });
            }
        }
        Ok(StoreOutcome::Stored)
    }

    async fn list_keys(&self, limit: usize) -> StorageResult<KeyListing> {
        let now = Utc::now();
        let mut fresh: Vec<(u64, ListedKey)> = self
            .entries
            .iter()
            .filter(|item| item.value().entry.is_fresh_at(now))
            .map(|item| {
                (
                    item.value().seq,
                    ListedKey {
                        url: item.key().as_str().to_string(),
                        method: item.value().entry.method.clone(),
                    },
                )
            })
            .collect();

        let count = fresh.len() as u64;
        fresh.sort_by_key(|(seq, _)| *seq);
        let entries = fresh
            .into_iter()
            .take(limit)
            .map(|(_, listed)| listed)
            .collect();

        Ok(KeyListing { count, entries })
    }

    async fn purge_expired(&self) -> StorageResult<u64> {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, slot| slot.entry.is_fresh_at(now));
        Ok(before.saturating_sub(self.entries.len()) as u64)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
