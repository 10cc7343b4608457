//! Shared LMDB plumbing for the cache and stats backends.
//!
//! Uses the heed crate (Rust bindings for LMDB). Each backend opens its own
//! environment in its own directory; LMDB refuses to open one environment
//! twice in a process.

use std::path::Path;

use heed::{Env, EnvOpenOptions};
use inkcache_core::StorageError;

/// Error type for LMDB store operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStoreError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Stored bytes do not match the expected layout.
    #[error("Corrupt record {key}: {reason}")]
    Corrupt { key: String, reason: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbStoreError> for StorageError {
    fn from(e: LmdbStoreError) -> Self {
        match e {
            LmdbStoreError::Serialization(reason) => StorageError::Serialization { reason },
            LmdbStoreError::Corrupt { key, reason } => StorageError::CorruptRecord { key, reason },
            LmdbStoreError::Transaction(reason) => StorageError::TransactionFailed { reason },
            other => StorageError::Backend {
                reason: other.to_string(),
            },
        }
    }
}

pub(crate) fn txn_err(e: heed::Error) -> LmdbStoreError {
    LmdbStoreError::Transaction(e.to_string())
}

/// Open (creating if needed) an LMDB environment at `path`.
///
/// # Arguments
///
/// * `path` - Directory where LMDB files will be stored
/// * `max_size_mb` - Maximum size of the database in megabytes
/// * `max_dbs` - Number of named databases the environment may hold
pub(crate) fn open_env<P: AsRef<Path>>(
    path: P,
    max_size_mb: usize,
    max_dbs: u32,
) -> Result<Env, LmdbStoreError> {
    std::fs::create_dir_all(&path)?;

    // SAFETY: each backend owns its directory and the environment is opened
    // once per process.
    unsafe {
        EnvOpenOptions::new()
            .map_size(max_size_mb * 1024 * 1024)
            .max_dbs(max_dbs)
            .open(path.as_ref())
    }
    .map_err(|e| LmdbStoreError::EnvOpen(e.to_string()))
}
