//! INKCACHE Storage - Cache and Stats Stores
//!
//! Defines the two storage seams the render pipeline talks to, each with an
//! in-memory backend (tests, single-process deployments) and an LMDB backend
//! (durable across restarts).

pub mod cache;
mod lmdb;
pub mod stats;

pub use cache::{CacheStore, InMemoryCacheStore, LmdbCacheStore};
pub use lmdb::LmdbStoreError;
pub use stats::{InMemoryStatsStore, LmdbStatsStore, StatsStore};
