//! HTTP Routes
//!
//! Assembles the render endpoint, the stats and debug endpoints, health
//! checks and metrics into one router.

use std::time::Duration;

use axum::{
    http::{Method, Uri},
    middleware,
    routing::{any, get},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::constants::DEFAULT_CORS_MAX_AGE_SECS;
use crate::error::ApiError;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

pub mod cache_entries;
pub mod cache_stats;
pub mod health;
pub mod svg;

/// Permissive CORS: diagrams are embedded from arbitrary origins.
fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any)
        .expose_headers(Any)
        .max_age(Duration::from_secs(DEFAULT_CORS_MAX_AGE_SECS))
}

/// 404 for every path without a route.
async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(uri.path())
}

/// Create the complete API router.
pub fn create_api_router(state: AppState) -> Router {
    Router::new()
        .route("/svg", any(svg::render_svg))
        .route("/cache-stats", any(cache_stats::get_stats))
        .route("/cache-stats/reset", any(cache_stats::reset_stats))
        .route("/cache-entries", any(cache_entries::list_entries))
        .route("/metrics", get(metrics_handler))
        .nest("/health", health::create_router())
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::from_fn(observability_middleware))
        .layer(build_cors_layer())
}
