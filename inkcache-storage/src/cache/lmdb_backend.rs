//! LMDB-backed cache store.
//!
//! Persists rendered artifacts across restarts in a memory-mapped LMDB
//! database via heed.
//!
//! # Key Layout
//!
//! LMDB caps keys at 511 bytes while request URLs embed the entire
//! compressed diagram, so the physical key is the SHA-256 digest of the
//! canonical URL. The URL itself travels inside the record and is what
//! listings report.
//!
//! # Record Layout
//!
//! `[stored_at millis: 8 bytes LE][meta len: 4 bytes LE][meta JSON][body]`
//!
//! # Thread Safety
//!
//! - Read transactions for `lookup` and `list_keys`
//! - A single write transaction for the check-then-put in `store`, so
//!   concurrent writers cannot both observe "absent"

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use heed::types::Bytes;
use heed::{Database, Env};
use inkcache_core::{CacheEntry, CacheKey, KeyListing, ListedKey, StorageResult, StoreOutcome};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::traits::CacheStore;
use crate::lmdb::{open_env, txn_err, LmdbStoreError};

const ENTRIES_DB: &str = "entries";
const HEADER_LEN: usize = 12;

/// Metadata stored next to the artifact body.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordMeta {
    url: String,
    content_type: String,
    max_age_secs: u64,
    method: String,
}

/// Physical LMDB key for a canonical URL.
fn physical_key(key: &CacheKey) -> [u8; 32] {
    let digest = Sha256::digest(key.as_str().as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

fn encode_record(key: &CacheKey, entry: &CacheEntry) -> Result<Vec<u8>, LmdbStoreError> {
    let meta = RecordMeta {
        url: key.as_str().to_string(),
        content_type: entry.content_type.clone(),
        max_age_secs: entry.max_age.as_secs(),
        method: entry.method.clone(),
    };
    let meta_bytes =
        serde_json::to_vec(&meta).map_err(|e| LmdbStoreError::Serialization(e.to_string()))?;
    let meta_len = u32::try_from(meta_bytes.len())
        .map_err(|_| LmdbStoreError::Serialization("record metadata too large".into()))?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + meta_bytes.len() + entry.body.len());
    bytes.extend_from_slice(&entry.stored_at.timestamp_millis().to_le_bytes());
    bytes.extend_from_slice(&meta_len.to_le_bytes());
    bytes.extend_from_slice(&meta_bytes);
    bytes.extend_from_slice(&entry.body);
    Ok(bytes)
}

fn decode_record(physical: &[u8], bytes: &[u8]) -> Result<(RecordMeta, CacheEntry), LmdbStoreError> {
    let corrupt = |reason: &str| LmdbStoreError::Corrupt {
        key: hex::encode(physical),
        reason: reason.to_string(),
    };

    if bytes.len() < HEADER_LEN {
        return Err(corrupt("record shorter than header"));
    }

    let timestamp_bytes: [u8; 8] = bytes[0..8]
        .try_into()
        .map_err(|_| corrupt("invalid timestamp"))?;
    let len_bytes: [u8; 4] = bytes[8..12]
        .try_into()
        .map_err(|_| corrupt("invalid metadata length"))?;
    let meta_len = u32::from_le_bytes(len_bytes) as usize;

    let meta_end = HEADER_LEN
        .checked_add(meta_len)
        .filter(|end| *end <= bytes.len())
        .ok_or_else(|| corrupt("metadata length exceeds record"))?;

    let meta: RecordMeta = serde_json::from_slice(&bytes[HEADER_LEN..meta_end])
        .map_err(|e| corrupt(&format!("invalid metadata: {}", e)))?;

    let stored_at = DateTime::from_timestamp_millis(i64::from_le_bytes(timestamp_bytes))
        .ok_or_else(|| corrupt("timestamp out of range"))?;

    let entry = CacheEntry {
        body: bytes[meta_end..].to_vec(),
        content_type: meta.content_type.clone(),
        max_age: Duration::from_secs(meta.max_age_secs),
        stored_at,
        method: meta.method.clone(),
    };
    Ok((meta, entry))
}

/// LMDB-backed cache store.
///
/// # Example
///
/// ```ignore
/// use inkcache_storage::{CacheStore, LmdbCacheStore};
///
/// let store = LmdbCacheStore::open("/var/lib/inkcache/cache", 1024)?;
/// store.store(&key, &entry).await?;
/// let cached = store.lookup(&key).await?;
/// ```
pub struct LmdbCacheStore {
    env: Env,
    db: Database<Bytes, Bytes>,
}

impl LmdbCacheStore {
    /// Open or create a cache store.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - LMDB environment cannot be opened
    /// - Database cannot be created
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbStoreError> {
        let env = open_env(path, max_size_mb, 1)?;

        let mut wtxn = env.write_txn().map_err(txn_err)?;
        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, Some(ENTRIES_DB))
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;
        wtxn.commit().map_err(txn_err)?;

        Ok(Self { env, db })
    }
}

/// Unreadable records count as expired so the sweep clears them.
fn record_is_fresh(physical: &[u8], bytes: &[u8], now: DateTime<Utc>) -> bool {
    decode_record(physical, bytes)
        .map(|(_, entry)| entry.is_fresh_at(now))
        .unwrap_or(false)
}

#[async_trait]
impl CacheStore for LmdbCacheStore {
    async fn lookup(&self, key: &CacheKey) -> StorageResult<Option<CacheEntry>> {
        let physical = physical_key(key);
        let rtxn = self.env.read_txn().map_err(txn_err)?;

        let Some(bytes) = self.db.get(&rtxn, &physical).map_err(txn_err)? else {
            return Ok(None);
        };

        let (meta, entry) = decode_record(&physical, bytes)?;
        // Digest collision guard: the stored URL must match exactly.
        if meta.url != key.as_str() || !entry.is_fresh() {
            return Ok(None);
        }
        Ok(Some(entry))
    }

    async fn store(&self, key: &CacheKey, entry: &CacheEntry) -> StorageResult<StoreOutcome> {
        let physical = physical_key(key);
        let record = encode_record(key, entry)?;

        let mut wtxn = self.env.write_txn().map_err(txn_err)?;

        let existing_fresh = match self.db.get(&wtxn, &physical).map_err(txn_err)? {
            Some(bytes) => decode_record(&physical, bytes)
                .map(|(meta, existing)| meta.url == key.as_str() && existing.is_fresh())
                .unwrap_or(false),
            None => false,
        };
        if existing_fresh {
            return Ok(StoreOutcome::AlreadyPresent);
        }

        self.db
            .put(&mut wtxn, &physical, &record)
            .map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)?;

        Ok(StoreOutcome::Stored)
    }

    async fn list_keys(&self, limit: usize) -> StorageResult<KeyListing> {
        let now = Utc::now();
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        let iter = self.db.iter(&rtxn).map_err(txn_err)?;

        let mut listing = KeyListing::default();
        for result in iter {
            let (physical, bytes) = match result {
                Ok(pair) => pair,
                Err(_) => continue,
            };
            let (meta, entry) = match decode_record(physical, bytes) {
                Ok(decoded) => decoded,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable cache record");
                    continue;
                }
            };
            if !entry.is_fresh_at(now) {
                continue;
            }
            listing.count += 1;
            if listing.entries.len() < limit {
                listing.entries.push(ListedKey {
                    url: meta.url,
                    method: meta.method,
                });
            }
        }

        Ok(listing)
    }

    async fn purge_expired(&self) -> StorageResult<u64> {
        let now = Utc::now();
        let candidates: Vec<Vec<u8>> = {
            let rtxn = self.env.read_txn().map_err(txn_err)?;
            let iter = self.db.iter(&rtxn).map_err(txn_err)?;
            iter.filter_map(|result| result.ok())
                .filter(|(key, bytes)| !record_is_fresh(key, bytes, now))
                .map(|(key, _)| key.to_vec())
                .collect()
        };
        if candidates.is_empty() {
            return Ok(0);
        }

        // Re-checked under the write lock: a store may have refreshed the
        // record since the scan.
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        let mut deleted = 0u64;
        for key in &candidates {
            let still_expired = match self.db.get(&wtxn, key).map_err(txn_err)? {
                Some(bytes) => !record_is_fresh(key, bytes, now),
                None => false,
            };
            if still_expired && self.db.delete(&mut wtxn, key).map_err(txn_err)? {
                deleted += 1;
            }
        }
        wtxn.commit().map_err(txn_err)?;

        if deleted > 0 {
            tracing::debug!(deleted, "Purged expired cache records");
        }
        Ok(deleted)
    }

    fn backend_name(&self) -> &'static str {
        "lmdb"
    }
}
