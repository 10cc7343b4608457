//! Cache entry types.
//!
//! Entries are content-addressed by the literal request URL. Two URLs that
//! decode to the same diagram are distinct keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::constants::{DEFAULT_MAX_AGE_SECS, SVG_CONTENT_TYPE};

/// Canonical request URL used as a cache key.
///
/// Stored verbatim: no reordering of query parameters, no case folding,
/// no whitespace trimming.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for CacheKey {
    fn from(url: String) -> Self {
        Self(url)
    }
}

/// A rendered artifact plus the response metadata needed to replay it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Rendered artifact bytes, returned unmodified on a hit.
    pub body: Vec<u8>,
    /// Response content type.
    pub content_type: String,
    /// Freshness lifetime.
    pub max_age: Duration,
    /// When the entry was written.
    pub stored_at: DateTime<Utc>,
    /// HTTP method of the request that produced the entry.
    pub method: String,
}

impl CacheEntry {
    /// Create an SVG entry stored now with the default one-year lifetime.
    pub fn svg(body: impl Into<Vec<u8>>, method: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: SVG_CONTENT_TYPE.to_string(),
            max_age: Duration::from_secs(DEFAULT_MAX_AGE_SECS),
            stored_at: Utc::now(),
            method: method.into(),
        }
    }

    /// Override the freshness lifetime.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Override the write timestamp.
    pub fn with_stored_at(mut self, stored_at: DateTime<Utc>) -> Self {
        self.stored_at = stored_at;
        self
    }

    /// The `Cache-Control` directive that accompanies this entry.
    pub fn cache_control(&self) -> String {
        format!("public, max-age={}", self.max_age.as_secs())
    }

    /// When the entry stops being fresh.
    pub fn expires_at(&self) -> DateTime<Utc> {
        let max_age = chrono::Duration::from_std(self.max_age)
            .unwrap_or_else(|_| chrono::Duration::seconds(DEFAULT_MAX_AGE_SECS as i64));
        self.stored_at
            .checked_add_signed(max_age)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Whether the entry is still fresh at `now`.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at()
    }

    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Utc::now())
    }
}

/// Result of an idempotent store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// The entry was written.
    Stored,
    /// A fresh entry already existed; nothing was written.
    AlreadyPresent,
}

/// One key in the cache entry listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedKey {
    pub url: String,
    pub method: String,
}

/// Bounded key listing with an uncapped total.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyListing {
    /// Number of fresh keys in the store. Never capped.
    pub count: u64,
    /// At most `limit` keys.
    pub entries: Vec<ListedKey>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_is_verbatim() {
        let a = CacheKey::new("/svg?mermaid=abc&theme=dark");
        let b = CacheKey::new("/svg?theme=dark&mermaid=abc");
        assert_ne!(a, b);
        assert_eq!(a.as_str(), "/svg?mermaid=abc&theme=dark");
    }

    #[test]
    fn test_svg_entry_defaults() {
        let entry = CacheEntry::svg("<svg></svg>", "GET");
        assert_eq!(entry.content_type, "image/svg+xml");
        assert_eq!(entry.cache_control(), "public, max-age=31536000");
        assert!(entry.is_fresh());
    }

    #[test]
    fn test_entry_expiry() {
        let stored_at = Utc::now() - chrono::Duration::seconds(120);
        let entry = CacheEntry::svg("<svg/>", "GET")
            .with_max_age(Duration::from_secs(60))
            .with_stored_at(stored_at);

        assert!(!entry.is_fresh());
        assert!(entry.is_fresh_at(stored_at + chrono::Duration::seconds(59)));
        assert!(!entry.is_fresh_at(stored_at + chrono::Duration::seconds(60)));
    }

    #[test]
    fn test_key_listing_serialization() {
        let listing = KeyListing {
            count: 1,
            entries: vec![ListedKey {
                url: "/svg?mermaid=x".to_string(),
                method: "GET".to_string(),
            }],
        };
        let json = serde_json::to_value(&listing).expect("listing should serialize");
        assert_eq!(json["count"], 1);
        assert_eq!(json["entries"][0]["url"], "/svg?mermaid=x");
        assert_eq!(json["entries"][0]["method"], "GET");
    }
}
