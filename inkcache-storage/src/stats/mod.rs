//! Hit/miss statistics record.

pub mod lmdb_backend;
pub mod memory;
pub mod traits;

pub use lmdb_backend::LmdbStatsStore;
pub use memory::InMemoryStatsStore;
pub use traits::StatsStore;
