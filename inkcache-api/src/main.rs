//! INKCACHE API Server Entry Point
//!
//! Bootstraps configuration, opens the stores, starts the background
//! writer and the expiry sweep, and serves the Axum router until a shutdown
//! signal arrives.

use std::sync::Arc;

use inkcache_api::{
    create_api_router, expiry_sweep_task, open_stores, ApiConfig, ApiError, ApiResult, AppState,
    BackgroundWriter,
};
use inkcache_api::telemetry::{init_tracer, shutdown_tracer, TelemetryConfig};
use inkcache_render::{RemoteBrowserRenderer, Renderer};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracer(&telemetry_config)?;

    let config = ApiConfig::from_env()?;
    let addr = config.bind_addr()?;

    let (cache, stats) = open_stores(&config)?;
    let (writer, worker) = BackgroundWriter::spawn(Arc::clone(&cache), Arc::clone(&stats));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = tokio::spawn(expiry_sweep_task(
        Arc::clone(&cache),
        config.expiry_sweep_interval,
        shutdown_rx,
    ));

    let mut remote = RemoteBrowserRenderer::new(config.renderer_url.clone())?;
    if let Some(token) = &config.renderer_token {
        remote = remote.with_token(token.clone());
    }
    let renderer: Arc<dyn Renderer> = Arc::new(remote);

    let state = AppState::new(
        cache,
        stats,
        renderer,
        writer,
        config.render_timeout,
        config.cache_max_age,
        config.entry_listing_limit,
    );
    let app = create_api_router(state);

    tracing::info!(
        %addr,
        renderer_url = %config.renderer_url,
        store_backend = ?config.store_backend,
        "Starting INKCACHE API server"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    // The router owns the last writer handles; once serve returns they are
    // dropped and the worker drains what is left in the queue.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = sweeper.await {
        tracing::error!(error = %e, "Expiry sweep task failed");
    }

    match tokio::time::timeout(config.shutdown_drain, worker).await {
        Ok(Ok(metrics)) => {
            let snapshot = metrics.snapshot();
            tracing::info!(
                jobs_applied = snapshot.jobs_applied,
                jobs_failed = snapshot.jobs_failed,
                "Background writes drained"
            );
        }
        Ok(Err(e)) => tracing::error!(error = %e, "Background writer task failed"),
        Err(_) => tracing::warn!(
            drain_secs = config.shutdown_drain.as_secs(),
            "Background writer did not drain in time, pending writes lost"
        ),
    }

    shutdown_tracer();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
