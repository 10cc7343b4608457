//! Rendered-response cache.
//!
//! Entries are keyed by the verbatim request URL and stored once. A fresh
//! entry is never overwritten; an expired one is treated as absent and may be
//! replaced.

pub mod lmdb_backend;
pub mod memory;
pub mod traits;

pub use lmdb_backend::LmdbCacheStore;
pub use memory::InMemoryCacheStore;
pub use traits::CacheStore;
