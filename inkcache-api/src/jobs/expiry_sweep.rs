//! Expiry Sweep Background Task
//!
//! Expired cache entries are never served, but they are only removed when
//! the same key is requested again. This task periodically deletes them so
//! keys that are never requested again do not accumulate.
//!
//! Each sweep calls [`CacheStore::purge_expired`]. A failed sweep is logged
//! and counted; the next tick tries again.
//!
//! # Example
//!
//! ```ignore
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//! let handle = tokio::spawn(expiry_sweep_task(cache, Duration::from_secs(3600), shutdown_rx));
//!
//! // Later, trigger shutdown
//! let _ = shutdown_tx.send(true);
//! let metrics = handle.await?;
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use inkcache_storage::CacheStore;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::telemetry::with_metrics;

// ============================================================================
// METRICS
// ============================================================================

/// Counters for expiry sweep activity.
#[derive(Debug, Default)]
pub struct ExpirySweepMetrics {
    /// Sweeps that completed
    pub sweeps: AtomicU64,

    /// Expired entries deleted since startup
    pub entries_purged: AtomicU64,

    /// Sweeps that failed
    pub sweep_errors: AtomicU64,
}

impl ExpirySweepMetrics {
    pub fn snapshot(&self) -> ExpirySweepSnapshot {
        ExpirySweepSnapshot {
            sweeps: self.sweeps.load(Ordering::Relaxed),
            entries_purged: self.entries_purged.load(Ordering::Relaxed),
            sweep_errors: self.sweep_errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of sweep metrics at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpirySweepSnapshot {
    pub sweeps: u64,
    pub entries_purged: u64,
    pub sweep_errors: u64,
}

// ============================================================================
// BACKGROUND TASK
// ============================================================================

/// Sweep expired entries every `every` until the shutdown signal flips.
///
/// The first sweep runs immediately.
pub async fn expiry_sweep_task(
    cache: Arc<dyn CacheStore>,
    every: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<ExpirySweepMetrics> {
    let metrics = Arc::new(ExpirySweepMetrics::default());

    let mut sweep_interval = interval(every);
    sweep_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        backend = cache.backend_name(),
        interval_secs = every.as_secs(),
        "Expiry sweep task started"
    );

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                // A dropped sender also means shutdown.
                if changed.is_err() || *shutdown_rx.borrow() {
                    tracing::info!("Expiry sweep task shutting down");
                    break;
                }
            }

            _ = sweep_interval.tick() => {
                sweep_once(cache.as_ref(), &metrics).await;
            }
        }
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        sweeps = snapshot.sweeps,
        entries_purged = snapshot.entries_purged,
        sweep_errors = snapshot.sweep_errors,
        "Expiry sweep task completed"
    );

    metrics
}

/// Run one sweep and record its outcome.
pub async fn sweep_once(cache: &dyn CacheStore, metrics: &ExpirySweepMetrics) {
    match cache.purge_expired().await {
        Ok(purged) => {
            metrics.sweeps.fetch_add(1, Ordering::Relaxed);
            metrics.entries_purged.fetch_add(purged, Ordering::Relaxed);
            with_metrics(|m| m.record_background_job("expiry_sweep", true));
            if purged > 0 {
                tracing::info!(purged, "Expired cache entries deleted");
            } else {
                tracing::trace!("Expiry sweep found nothing to delete");
            }
        }
        Err(e) => {
            metrics.sweep_errors.fetch_add(1, Ordering::Relaxed);
            with_metrics(|m| m.record_background_job("expiry_sweep", false));
            tracing::warn!(error = %e, "Expiry sweep failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use inkcache_core::{
        CacheEntry, CacheKey, KeyListing, StorageError, StorageResult, StoreOutcome,
    };
    use inkcache_storage::InMemoryCacheStore;

    struct OfflineCache;

    fn offline() -> StorageError {
        StorageError::Backend {
            reason: "offline".to_string(),
        }
    }

    #[async_trait]
    impl CacheStore for OfflineCache {
        async fn lookup(&self, _key: &CacheKey) -> StorageResult<Option<CacheEntry>> {
            Err(offline())
        }

        async fn store(&self, _key: &CacheKey, _entry: &CacheEntry) -> StorageResult<StoreOutcome> {
            Err(offline())
        }

        async fn list_keys(&self, _limit: usize) -> StorageResult<KeyListing> {
            Err(offline())
        }

        async fn purge_expired(&self) -> StorageResult<u64> {
            Err(offline())
        }

        fn backend_name(&self) -> &'static str {
            "offline"
        }
    }

    async fn cache_with_one_stale_entry() -> Arc<InMemoryCacheStore> {
        let cache = Arc::new(InMemoryCacheStore::new());
        let stale = CacheEntry::svg("<svg>old</svg>", "GET")
            .with_max_age(Duration::from_secs(1))
            .with_stored_at(Utc::now() - chrono::Duration::seconds(10));
        cache
            .store(&CacheKey::new("/svg?mermaid=old"), &stale)
            .await
            .unwrap();
        cache
            .store(
                &CacheKey::new("/svg?mermaid=new"),
                &CacheEntry::svg("<svg>new</svg>", "GET"),
            )
            .await
            .unwrap();
        cache
    }

    #[tokio::test]
    async fn test_sweep_deletes_only_expired_entries() {
        let cache = cache_with_one_stale_entry().await;
        let metrics = ExpirySweepMetrics::default();

        sweep_once(cache.as_ref(), &metrics).await;
        sweep_once(cache.as_ref(), &metrics).await;

        assert!(cache
            .lookup(&CacheKey::new("/svg?mermaid=new"))
            .await
            .unwrap()
            .is_some());

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.sweeps, 2);
        assert_eq!(snapshot.entries_purged, 1);
        assert_eq!(snapshot.sweep_errors, 0);
    }

    #[tokio::test]
    async fn test_failed_sweep_is_counted() {
        let metrics = ExpirySweepMetrics::default();
        sweep_once(&OfflineCache, &metrics).await;

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.sweeps, 0);
        assert_eq!(snapshot.sweep_errors, 1);
    }

    #[tokio::test]
    async fn test_task_sweeps_then_stops_on_shutdown() {
        let cache = cache_with_one_stale_entry().await;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(expiry_sweep_task(
            cache.clone(),
            Duration::from_millis(20),
            shutdown_rx,
        ));

        // The first tick fires immediately.
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send(true).unwrap();
        let metrics = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("task stops on shutdown")
            .unwrap();

        let snapshot = metrics.snapshot();
        assert!(snapshot.sweeps >= 1);
        assert_eq!(snapshot.entries_purged, 1);
        assert_eq!(snapshot.sweep_errors, 0);
        assert_eq!(cache.purge_expired().await.unwrap(), 0);
    }
}
