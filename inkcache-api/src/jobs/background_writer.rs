//! Background Writer
//!
//! Cache stores and stats increments are handed to a single worker task over
//! an unbounded queue, so request handlers never wait on them. The worker
//! belongs to the runtime rather than to any request: a job enqueued by a
//! handler that has already returned still runs.
//!
//! Jobs are applied one at a time in FIFO order. Every stats
//! read-modify-write therefore happens on one task, and increments from
//! concurrent requests cannot overwrite each other. Stats resets go through
//! the same queue, so increments enqueued before a reset are applied before
//! it and never land on the zeroed record.
//!
//! # Usage
//!
//! ```ignore
//! let (writer, worker) = BackgroundWriter::spawn(cache, stats);
//! writer.record_miss();
//! writer.store(key, entry);
//! writer.flush().await;
//!
//! // On shutdown: drop every writer clone, then wait for the drain.
//! drop(writer);
//! let metrics = worker.await?;
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use inkcache_core::{CacheEntry, CacheKey, CacheStats, StorageError, StorageResult, StoreOutcome};
use inkcache_storage::{CacheStore, StatsStore};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::telemetry::with_metrics;

// ============================================================================
// JOBS
// ============================================================================

/// One unit of deferred work.
#[derive(Debug)]
pub enum WriteJob {
    /// Idempotently store a rendered entry.
    Store { key: CacheKey, entry: CacheEntry },
    /// Increment the hit counter.
    RecordHit,
    /// Increment the miss counter.
    RecordMiss,
    /// Zero the stats record and reply with what was written.
    ResetStats(oneshot::Sender<StorageResult<CacheStats>>),
    /// Signal once every job queued before this one has been applied.
    Flush(oneshot::Sender<()>),
}

impl WriteJob {
    fn label(&self) -> &'static str {
        match self {
            WriteJob::Store { .. } => "store",
            WriteJob::RecordHit => "record_hit",
            WriteJob::RecordMiss => "record_miss",
            WriteJob::ResetStats(_) => "reset_stats",
            WriteJob::Flush(_) => "flush",
        }
    }
}

// ============================================================================
// METRICS
// ============================================================================

/// Counters for background write activity.
#[derive(Debug, Default)]
pub struct BackgroundWriterMetrics {
    /// Jobs applied successfully
    pub jobs_applied: AtomicU64,

    /// Jobs whose store call failed
    pub jobs_failed: AtomicU64,

    /// Store jobs skipped because a fresh entry already existed
    pub stores_skipped: AtomicU64,

    /// Jobs that could not be enqueued because the worker had stopped
    pub jobs_dropped: AtomicU64,
}

impl BackgroundWriterMetrics {
    pub fn snapshot(&self) -> BackgroundWriterSnapshot {
        BackgroundWriterSnapshot {
            jobs_applied: self.jobs_applied.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            stores_skipped: self.stores_skipped.load(Ordering::Relaxed),
            jobs_dropped: self.jobs_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of writer metrics at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackgroundWriterSnapshot {
    pub jobs_applied: u64,
    pub jobs_failed: u64,
    pub stores_skipped: u64,
    pub jobs_dropped: u64,
}

// ============================================================================
// WRITER HANDLE
// ============================================================================

/// Cloneable handle for enqueueing background writes.
#[derive(Clone)]
pub struct BackgroundWriter {
    tx: mpsc::UnboundedSender<WriteJob>,
    metrics: Arc<BackgroundWriterMetrics>,
}

impl BackgroundWriter {
    /// Spawn the worker on the current runtime.
    ///
    /// The returned handle resolves once every `BackgroundWriter` clone has
    /// been dropped and the queue has drained.
    pub fn spawn(
        cache: Arc<dyn CacheStore>,
        stats: Arc<dyn StatsStore>,
    ) -> (Self, JoinHandle<Arc<BackgroundWriterMetrics>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let metrics = Arc::new(BackgroundWriterMetrics::default());
        let handle = tokio::spawn(background_writer_task(cache, stats, rx, Arc::clone(&metrics)));
        (Self { tx, metrics }, handle)
    }

    /// Queue a job. Never blocks. Returns false if the worker has stopped.
    pub fn enqueue(&self, job: WriteJob) -> bool {
        let label = job.label();
        match self.tx.send(job) {
            Ok(()) => true,
            Err(_) => {
                self.metrics.jobs_dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(job = label, "Background writer stopped, job dropped");
                false
            }
        }
    }

    pub fn store(&self, key: CacheKey, entry: CacheEntry) -> bool {
        self.enqueue(WriteJob::Store { key, entry })
    }

    pub fn record_hit(&self) -> bool {
        self.enqueue(WriteJob::RecordHit)
    }

    pub fn record_miss(&self) -> bool {
        self.enqueue(WriteJob::RecordMiss)
    }

    /// Reset the stats record after every job enqueued before this call.
    pub async fn reset_stats(&self) -> StorageResult<CacheStats> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if !self.enqueue(WriteJob::ResetStats(reply_tx)) {
            return Err(writer_stopped());
        }
        reply_rx.await.map_err(|_| writer_stopped())?
    }

    /// Wait until every job enqueued before this call has been applied.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.enqueue(WriteJob::Flush(done_tx)) {
            let _ = done_rx.await;
        }
    }

    pub fn metrics(&self) -> BackgroundWriterSnapshot {
        self.metrics.snapshot()
    }
}

impl std::fmt::Debug for BackgroundWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundWriter")
            .field("closed", &self.tx.is_closed())
            .field("metrics", &self.metrics.snapshot())
            .finish()
    }
}

fn writer_stopped() -> StorageError {
    StorageError::Backend {
        reason: "background writer stopped".to_string(),
    }
}

// ============================================================================
// BACKGROUND TASK
// ============================================================================

/// Apply jobs until every sender is gone and the queue is empty.
async fn background_writer_task(
    cache: Arc<dyn CacheStore>,
    stats: Arc<dyn StatsStore>,
    mut rx: mpsc::UnboundedReceiver<WriteJob>,
    metrics: Arc<BackgroundWriterMetrics>,
) -> Arc<BackgroundWriterMetrics> {
    tracing::info!(
        cache_backend = cache.backend_name(),
        stats_backend = stats.backend_name(),
        "Background writer started"
    );

    while let Some(job) = rx.recv().await {
        apply_job(cache.as_ref(), stats.as_ref(), job, &metrics).await;
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        jobs_applied = snapshot.jobs_applied,
        jobs_failed = snapshot.jobs_failed,
        stores_skipped = snapshot.stores_skipped,
        "Background writer drained"
    );

    metrics
}

async fn apply_job(
    cache: &dyn CacheStore,
    stats: &dyn StatsStore,
    job: WriteJob,
    metrics: &BackgroundWriterMetrics,
) {
    let label = job.label();
    let result = match job {
        WriteJob::Flush(done) => {
            let _ = done.send(());
            return;
        }
        WriteJob::Store { key, entry } => match cache.store(&key, &entry).await {
            Ok(StoreOutcome::Stored) => {
                tracing::debug!(url = %key, bytes = entry.body.len(), "Cached rendered diagram");
                Ok(())
            }
            Ok(StoreOutcome::AlreadyPresent) => {
                metrics.stores_skipped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(url = %key, "Fresh entry already cached, store skipped");
                Ok(())
            }
            Err(e) => Err(e),
        },
        WriteJob::RecordHit => stats.record_hit().await,
        WriteJob::RecordMiss => stats.record_miss().await,
        WriteJob::ResetStats(reply) => {
            let result = stats.reset().await;
            let outcome = result.as_ref().map(|_| ()).map_err(Clone::clone);
            let _ = reply.send(result);
            outcome
        }
    };

    match result {
        Ok(()) => {
            metrics.jobs_applied.fetch_add(1, Ordering::Relaxed);
            with_metrics(|m| m.record_background_job(label, true));
        }
        Err(e) => {
            metrics.jobs_failed.fetch_add(1, Ordering::Relaxed);
            with_metrics(|m| m.record_background_job(label, false));
            tracing::warn!(job = label, error = %e, "Background write failed");
        }
    }
}
