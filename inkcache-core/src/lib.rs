//! INKCACHE Core - Data Model and Request Decoding
//!
//! Pure data structures, the error taxonomy, and the request decoder.
//! All other crates depend on this. No I/O happens here.

pub mod constants;
pub mod decode;
pub mod entry;
pub mod error;
pub mod request;
pub mod stats;

pub use constants::*;
pub use decode::{decode, decompress, encode, query_param};
pub use entry::{CacheEntry, CacheKey, KeyListing, ListedKey, StoreOutcome};
pub use error::{
    ConfigError, DecodeError, InkError, InkResult, MalformedOutput, RenderError, StorageError,
    StorageResult,
};
pub use request::{DecodedRequest, Theme};
pub use stats::CacheStats;

/// Timestamp type using UTC timezone.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
