//! LMDB-backed stats store.
//!
//! The whole record is one JSON blob under a fixed key. Increments read,
//! modify and write the blob inside a single LMDB write transaction; LMDB
//! admits one writer at a time, so concurrent increments cannot lose
//! updates.

use std::path::Path;

use async_trait::async_trait;
use heed::types::Bytes;
use heed::{Database, Env, RwTxn};
use inkcache_core::{CacheStats, StorageResult};

use super::traits::StatsStore;
use crate::lmdb::{open_env, txn_err, LmdbStoreError};

const STATS_DB: &str = "stats";
const STATS_KEY: &[u8] = b"cache_stats";

/// LMDB-backed durable stats record.
pub struct LmdbStatsStore {
    env: Env,
    db: Database<Bytes, Bytes>,
}

impl LmdbStatsStore {
    /// Open or create a stats store at `path`.
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbStoreError> {
        let env = open_env(path, max_size_mb, 1)?;

        let mut wtxn = env.write_txn().map_err(txn_err)?;
        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, Some(STATS_DB))
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;
        wtxn.commit().map_err(txn_err)?;

        Ok(Self { env, db })
    }

    fn parse(bytes: &[u8]) -> Result<CacheStats, LmdbStoreError> {
        serde_json::from_slice(bytes).map_err(|e| LmdbStoreError::Corrupt {
            key: String::from_utf8_lossy(STATS_KEY).into_owned(),
            reason: e.to_string(),
        })
    }

    fn write(&self, wtxn: &mut RwTxn<'_>, stats: &CacheStats) -> Result<(), LmdbStoreError> {
        let bytes =
            serde_json::to_vec(stats).map_err(|e| LmdbStoreError::Serialization(e.to_string()))?;
        self.db.put(wtxn, STATS_KEY, &bytes).map_err(txn_err)
    }

    /// Read-modify-write inside one write transaction.
    fn update(&self, apply: impl FnOnce(&mut CacheStats)) -> Result<(), LmdbStoreError> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;

        let mut stats = match self.db.get(&wtxn, STATS_KEY).map_err(txn_err)? {
            Some(bytes) => Self::parse(bytes)?,
            None => CacheStats::fresh(),
        };
        apply(&mut stats);

        self.write(&mut wtxn, &stats)?;
        wtxn.commit().map_err(txn_err)
    }
}

#[async_trait]
impl StatsStore for LmdbStatsStore {
    async fn read(&self) -> StorageResult<CacheStats> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        match self.db.get(&rtxn, STATS_KEY).map_err(txn_err)? {
            Some(bytes) => Ok(Self::parse(bytes)?),
            None => Ok(CacheStats::fresh()),
        }
    }

    async fn record_hit(&self) -> StorageResult<()> {
        Ok(self.update(CacheStats::increment_hits)?)
    }

    async fn record_miss(&self) -> StorageResult<()> {
        Ok(self.update(CacheStats::increment_misses)?)
    }

    async fn reset(&self) -> StorageResult<CacheStats> {
        let fresh = CacheStats::fresh();
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        self.write(&mut wtxn, &fresh)?;
        wtxn.commit().map_err(txn_err)?;
        Ok(fresh)
    }

    fn backend_name(&self) -> &'static str {
        "lmdb"
    }
}
