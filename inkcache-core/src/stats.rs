//! Hit/miss accounting record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single shared hit/miss record.
///
/// `hits + misses` equals the number of cache lookups observed since
/// `last_reset`. The counters are advisory: they track demand, so a miss
/// whose render later failed still counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub last_reset: DateTime<Utc>,
}

impl CacheStats {
    /// Zeroed counters stamped with `now`.
    pub fn zeroed(now: DateTime<Utc>) -> Self {
        Self {
            hits: 0,
            misses: 0,
            last_reset: now,
        }
    }

    /// Zeroed counters stamped with the current time.
    pub fn fresh() -> Self {
        Self::zeroed(Utc::now())
    }

    pub fn total(&self) -> u64 {
        self.hits.saturating_add(self.misses)
    }

    /// Hit rate between 0.0 and 1.0. Zero lookups yields 0.0.
    pub fn hit_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Hit rate as a percentage string with two decimals, e.g. `"78.95%"`.
    pub fn hit_rate_percent(&self) -> String {
        format!("{:.2}%", self.hit_rate() * 100.0)
    }

    pub fn increment_hits(&mut self) {
        self.hits = self.hits.saturating_add(1);
    }

    pub fn increment_misses(&mut self) {
        self.misses = self.misses.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_hit_rate_percent() {
        let stats = CacheStats {
            hits: 45,
            misses: 12,
            last_reset: Utc::now(),
        };
        assert_eq!(stats.total(), 57);
        assert_eq!(stats.hit_rate_percent(), "78.95%");
    }

    #[test]
    fn test_hit_rate_zero_total() {
        let stats = CacheStats::fresh();
        assert_eq!(stats.total(), 0);
        assert_eq!(stats.hit_rate(), 0.0);
        assert_eq!(stats.hit_rate_percent(), "0.00%");
    }

    #[test]
    fn test_serialized_field_names() {
        let stats = CacheStats::fresh();
        let json = serde_json::to_value(&stats).expect("stats should serialize");
        assert!(json.get("hits").is_some());
        assert!(json.get("misses").is_some());
        assert!(json.get("lastReset").is_some());
    }

    #[test]
    fn test_increments() {
        let mut stats = CacheStats::fresh();
        stats.increment_hits();
        stats.increment_misses();
        stats.increment_misses();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.total(), 3);
    }

    proptest! {
        #[test]
        fn prop_hit_rate_bounded(hits in 0u64..1_000_000, misses in 0u64..1_000_000) {
            let stats = CacheStats { hits, misses, last_reset: Utc::now() };
            let rate = stats.hit_rate();
            prop_assert!((0.0..=1.0).contains(&rate));
            prop_assert_eq!(stats.total(), hits + misses);
            prop_assert!(stats.hit_rate_percent().ends_with('%'));
        }
    }
}
