//! Liveness and readiness probes.
//!
//! `/health/ready` touches both stores: a stats read and a cache lookup for
//! a key that is never written. Either failing marks the instance unready.

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use inkcache_core::{CacheKey, StorageResult};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Cache key used by the readiness probe. `/svg` never produces it.
const PROBE_KEY: &str = "/health/ready";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Ok,
    Failing,
}

/// Outcome of probing one store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreProbe {
    pub status: ProbeStatus,
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StoreProbe {
    fn from_result<T>(backend: &str, started: Instant, result: StorageResult<T>) -> Self {
        match result {
            Ok(_) => Self {
                status: ProbeStatus::Ok,
                backend: backend.to_string(),
                latency_ms: Some(started.elapsed().as_millis() as u64),
                error: None,
            },
            Err(e) => Self {
                status: ProbeStatus::Failing,
                backend: backend.to_string(),
                latency_ms: None,
                error: Some(e.to_string()),
            },
        }
    }

    fn is_ok(&self) -> bool {
        self.status == ProbeStatus::Ok
    }
}

/// Body of `/health/ready`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Readiness {
    pub ready: bool,
    pub cache_store: StoreProbe,
    pub stats_store: StoreProbe,
    /// Background writes lost because the writer had stopped.
    pub background_jobs_dropped: u64,
    pub version: String,
    pub uptime_seconds: u64,
}

/// GET /health/ping
pub async fn ping() -> &'static str {
    "pong"
}

/// GET /health/live
///
/// Answers as long as the runtime is scheduling handlers.
pub async fn liveness() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// GET /health/ready
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let started = Instant::now();
    let cache_store = StoreProbe::from_result(
        state.cache.backend_name(),
        started,
        state.cache.lookup(&CacheKey::new(PROBE_KEY)).await,
    );

    let started = Instant::now();
    let stats_store = StoreProbe::from_result(
        state.stats.backend_name(),
        started,
        state.stats.read().await,
    );

    let ready = cache_store.is_ok() && stats_store.is_ok();
    if !ready {
        tracing::warn!(
            cache_error = ?cache_store.error,
            stats_error = ?stats_store.error,
            "Readiness probe failed"
        );
    }

    let body = Readiness {
        ready,
        cache_store,
        stats_store,
        background_jobs_dropped: state.writer().metrics().jobs_dropped,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    };

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}
