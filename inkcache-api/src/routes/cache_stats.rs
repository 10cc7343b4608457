//! Hit/miss statistics endpoints.
//!
//! Stats store failures never fail these routes. A failed read reports
//! zeroed counters and a failed reset still confirms; both are logged.

use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use inkcache_core::CacheStats;
use inkcache_storage::StatsStore;
use serde::{Deserialize, Serialize};

use crate::constants::STATS_RESET_MESSAGE;
use crate::pipeline::RenderPipeline;

// ============================================================================
// TYPES
// ============================================================================

/// Stats snapshot with derived fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub last_reset: DateTime<Utc>,
    pub total: u64,
    /// Two-decimal percentage, e.g. `"78.95%"`.
    pub hit_rate: String,
    /// Human-readable summary.
    pub efficiency: String,
}

impl From<CacheStats> for CacheStatsResponse {
    fn from(stats: CacheStats) -> Self {
        let total = stats.total();
        Self {
            hits: stats.hits,
            misses: stats.misses,
            last_reset: stats.last_reset,
            total,
            hit_rate: stats.hit_rate_percent(),
            efficiency: format!("{} of {} requests served from cache", stats.hits, total),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetResponse {
    pub message: String,
    pub last_reset: DateTime<Utc>,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// ANY /cache-stats
pub async fn get_stats(State(stats): State<Arc<dyn StatsStore>>) -> Json<CacheStatsResponse> {
    let snapshot = match stats.read().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!(error = %e, "Stats read failed, reporting zeroed counters");
            CacheStats::fresh()
        }
    };
    Json(snapshot.into())
}

/// ANY /cache-stats/reset
///
/// The reset is queued behind pending hit/miss increments.
pub async fn reset_stats(State(pipeline): State<Arc<RenderPipeline>>) -> Json<ResetResponse> {
    let last_reset = match pipeline.writer().reset_stats().await {
        Ok(fresh) => {
            tracing::info!(last_reset = %fresh.last_reset, "Cache statistics reset");
            fresh.last_reset
        }
        Err(e) => {
            tracing::warn!(error = %e, "Stats reset failed");
            Utc::now()
        }
    };
    Json(ResetResponse {
        message: STATS_RESET_MESSAGE.to_string(),
        last_reset,
    })
}
