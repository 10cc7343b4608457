//! Cache key listing endpoint.

use axum::{extract::State, Json};
use inkcache_core::KeyListing;

use crate::error::ApiResult;
use crate::state::AppState;

/// ANY /cache-entries
///
/// `count` covers every cached key; `entries` is capped at the configured
/// listing limit.
pub async fn list_entries(State(state): State<AppState>) -> ApiResult<Json<KeyListing>> {
    let listing = state.cache.list_keys(state.entry_listing_limit).await?;
    tracing::debug!(count = listing.count, listed = listing.entries.len(), "Listed cache entries");
    Ok(Json(listing))
}
