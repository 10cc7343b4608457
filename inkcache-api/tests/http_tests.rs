//! End-to-end HTTP tests for the INKCACHE API
//!
//! Drives the full router with `tower::ServiceExt::oneshot` against
//! in-memory stores and scripted renderers.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use inkcache_api::{create_api_router, AppState, BackgroundWriter};
use inkcache_core::{CacheEntry, CacheKey, CacheStats, DEFAULT_ENTRY_LISTING_LIMIT};
use inkcache_render::Renderer;
use inkcache_storage::{CacheStore, InMemoryCacheStore, InMemoryStatsStore, StatsStore};
use inkcache_test_utils::generators::{arb_cache_entry, arb_diagram_source, arb_theme_param};
use inkcache_test_utils::*;
use proptest::prelude::*;
use serde_json::Value;
use tower::ServiceExt;

// ============================================================================
// HARNESS
// ============================================================================

struct TestApp {
    state: AppState,
    cache: Arc<dyn CacheStore>,
    stats: Arc<dyn StatsStore>,
}

impl TestApp {
    fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self::with_timeout(renderer, Duration::from_secs(5))
    }

    fn with_timeout(renderer: Arc<dyn Renderer>, render_timeout: Duration) -> Self {
        let cache: Arc<dyn CacheStore> = Arc::new(InMemoryCacheStore::new());
        let stats: Arc<dyn StatsStore> = Arc::new(InMemoryStatsStore::new());
        let (writer, _worker) = BackgroundWriter::spawn(Arc::clone(&cache), Arc::clone(&stats));
        let state = AppState::new(
            Arc::clone(&cache),
            Arc::clone(&stats),
            renderer,
            writer,
            render_timeout,
            Duration::from_secs(31_536_000),
            DEFAULT_ENTRY_LISTING_LIMIT,
        );
        Self {
            state,
            cache,
            stats,
        }
    }

    fn router(&self) -> Router {
        create_api_router(self.state.clone())
    }

    async fn request(&self, method: Method, uri: &str) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = self.router().oneshot(request).await.unwrap();
        self.state.writer().flush().await;
        response
    }

    async fn get(&self, uri: &str) -> Response {
        self.request(Method::GET, uri).await
    }

    async fn stats(&self) -> CacheStats {
        self.stats.read().await.unwrap()
    }
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn header_str<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

// ============================================================================
// RENDER ENDPOINT
// ============================================================================

#[tokio::test]
async fn test_miss_then_hit_serves_identical_bytes() {
    let renderer = Arc::new(ScriptedRenderer::new());
    let app = TestApp::new(renderer.clone());
    let url = encode_url(SAMPLE_FLOWCHART, None);

    let first = app.get(&url).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(header_str(&first, "content-type"), Some("image/svg+xml"));
    assert_eq!(
        header_str(&first, "cache-control"),
        Some("public, max-age=31536000")
    );
    assert_eq!(header_str(&first, "x-cache"), Some("MISS"));
    let first_body = body_bytes(first).await;
    assert!(first_body.starts_with(b"<svg"));

    let second = app.get(&url).await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(header_str(&second, "x-cache"), Some("HIT"));
    assert_eq!(body_bytes(second).await, first_body);

    assert_eq!(renderer.calls(), 1);
    let stats = app.stats().await;
    assert_eq!((stats.hits, stats.misses), (1, 1));
}

#[tokio::test]
async fn test_dark_theme_reaches_renderer() {
    let renderer = Arc::new(ScriptedRenderer::new());
    let app = TestApp::new(renderer.clone());

    let response = app.get(&encode_url("graph LR; A-->B", Some("dark"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(body.contains("data-theme=\"dark\""));
    assert_eq!(renderer.last_source().as_deref(), Some("graph LR; A-->B"));
}

#[tokio::test]
async fn test_listing_records_request_method() {
    let renderer = Arc::new(ScriptedRenderer::new());
    let app = TestApp::new(renderer.clone());
    let url = encode_url(SAMPLE_FLOWCHART, None);

    let response = app.request(Method::POST, &url).await;
    assert_eq!(response.status(), StatusCode::OK);

    let listing = body_json(app.get("/cache-entries").await).await;
    assert_eq!(listing["count"], 1);
    assert_eq!(listing["entries"][0]["method"], "POST");
    assert_eq!(listing["entries"][0]["url"], url.as_str());
}

#[tokio::test]
async fn test_missing_payload_is_client_error() {
    let renderer = Arc::new(ScriptedRenderer::new());
    let app = TestApp::new(renderer.clone());

    let response = app.get("/svg?theme=dark").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "MISSING_PAYLOAD");
    assert_eq!(body["message"], "Missing mermaid parameter");

    let stats = app.stats().await;
    assert_eq!((stats.hits, stats.misses), (0, 0));
    assert_eq!(renderer.calls(), 0);
}

#[tokio::test]
async fn test_invalid_payload_is_client_error() {
    let renderer = Arc::new(ScriptedRenderer::new());
    let app = TestApp::new(renderer.clone());

    let response = app.get("/svg?mermaid=not!a!payload").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "INVALID_PAYLOAD");

    assert_eq!(app.stats().await.total(), 0);
    assert_eq!(renderer.calls(), 0);
}

#[tokio::test]
async fn test_render_failure_counts_miss_and_caches_nothing() {
    let app = TestApp::new(Arc::new(FailingRenderer::evaluation_failure()));
    let url = encode_url(SAMPLE_FLOWCHART, None);

    let response = app.get(&url).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["code"], "RENDER_FAILED");

    let stats = app.stats().await;
    assert_eq!((stats.hits, stats.misses), (0, 1));
    assert_eq!(app.cache.entry_count().await.unwrap(), 0);

    // The next request for the same URL is another miss.
    let again = app.get(&url).await;
    assert_eq!(again.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(app.stats().await.misses, 2);
}

#[tokio::test]
async fn test_launch_failure_is_render_failed() {
    let renderer = Arc::new(FailingRenderer::launch_failure());
    let app = TestApp::new(renderer.clone());

    let response = app.get(&encode_url(SAMPLE_FLOWCHART, Some("dark"))).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["code"], "RENDER_FAILED");
    // The browser's reason stays in the logs.
    assert!(!body["message"].as_str().unwrap_or("").contains("refused"));
    assert_eq!(renderer.calls(), 1);
}

#[tokio::test]
async fn test_render_timeout() {
    let renderer = Arc::new(ScriptedRenderer::with_delay(Duration::from_secs(10)));
    let app = TestApp::with_timeout(renderer, Duration::from_millis(50));

    let response = app.get(&encode_url(SAMPLE_FLOWCHART, None)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["code"], "RENDER_TIMEOUT");
    assert_eq!(app.cache.entry_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_malformed_output_is_not_cached() {
    let app = TestApp::new(Arc::new(MalformedRenderer::default()));

    let response = app.get(&encode_url(SAMPLE_FLOWCHART, None)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["code"], "MALFORMED_OUTPUT");
    assert_eq!(app.cache.entry_count().await.unwrap(), 0);
    assert_eq!(app.stats().await.misses, 1);
}

// ============================================================================
// STATS AND DEBUG ENDPOINTS
// ============================================================================

#[tokio::test]
async fn test_cache_stats_view() {
    let app = TestApp::new(Arc::new(ScriptedRenderer::new()));
    for _ in 0..45 {
        app.stats.record_hit().await.unwrap();
    }
    for _ in 0..12 {
        app.stats.record_miss().await.unwrap();
    }

    let response = app.get("/cache-stats").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["hits"], 45);
    assert_eq!(body["misses"], 12);
    assert_eq!(body["total"], 57);
    assert_eq!(body["hitRate"], "78.95%");
    assert_eq!(body["efficiency"], "45 of 57 requests served from cache");
    assert!(body["lastReset"].is_string());
}

#[tokio::test]
async fn test_cache_stats_empty() {
    let app = TestApp::new(Arc::new(ScriptedRenderer::new()));
    let body = body_json(app.get("/cache-stats").await).await;
    assert_eq!(body["total"], 0);
    assert_eq!(body["hitRate"], "0.00%");
}

#[tokio::test]
async fn test_reset_zeroes_counters() {
    let app = TestApp::new(Arc::new(ScriptedRenderer::new()));
    app.stats.record_hit().await.unwrap();
    app.stats.record_miss().await.unwrap();
    let before = app.stats().await.last_reset;

    let response = app.get("/cache-stats/reset").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Cache statistics reset");
    assert!(body["lastReset"].is_string());

    let stats = app.stats().await;
    assert_eq!((stats.hits, stats.misses), (0, 0));
    assert!(stats.last_reset >= before);
}

#[tokio::test]
async fn test_reset_discards_increments_still_queued() {
    let app = TestApp::new(Arc::new(ScriptedRenderer::new()));
    for _ in 0..10 {
        app.state.writer().record_hit();
        app.state.writer().record_miss();
    }

    let response = app.get("/cache-stats/reset").await;
    assert_eq!(response.status(), StatusCode::OK);

    let stats = app.stats().await;
    assert_eq!((stats.hits, stats.misses), (0, 0));
}

#[tokio::test]
async fn test_cache_entries_empty() {
    let app = TestApp::new(Arc::new(ScriptedRenderer::new()));
    let response = app.get("/cache-entries").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["count"], 0);
    assert_eq!(body["entries"], serde_json::json!([]));
}

#[tokio::test]
async fn test_cache_entries_listing_is_capped() {
    let app = TestApp::new(Arc::new(ScriptedRenderer::new()));
    for i in 0..73 {
        let key = CacheKey::new(format!("/svg?mermaid=entry{}", i));
        let entry = CacheEntry::svg(format!("<svg>{}</svg>", i), "GET");
        app.cache.store(&key, &entry).await.unwrap();
    }

    let body = body_json(app.get("/cache-entries").await).await;
    assert_eq!(body["count"], 73);
    assert_eq!(body["entries"].as_array().map(Vec::len), Some(50));
}

// ============================================================================
// ROUTER SURFACE
// ============================================================================

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let app = TestApp::new(Arc::new(ScriptedRenderer::new()));
    let response = app.get("/nope").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["code"], "NOT_FOUND");
    assert_eq!(app.stats().await.total(), 0);
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new(Arc::new(ScriptedRenderer::new()));

    let ping = app.get("/health/ping").await;
    assert_eq!(ping.status(), StatusCode::OK);
    assert_eq!(body_bytes(ping).await, b"pong");

    let live = app.get("/health/live").await;
    assert_eq!(live.status(), StatusCode::NO_CONTENT);

    let ready = app.get("/health/ready").await;
    assert_eq!(ready.status(), StatusCode::OK);
    let body = body_json(ready).await;
    assert_eq!(body["ready"], true);
    assert_eq!(body["cache_store"]["status"], "ok");
    assert_eq!(body["stats_store"]["backend"], "memory");
    assert_eq!(body["background_jobs_dropped"], 0);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = TestApp::new(Arc::new(ScriptedRenderer::new()));
    app.get(&encode_url(SAMPLE_FLOWCHART, None)).await;

    let response = app.get("/metrics").await;
    assert_eq!(response.status(), StatusCode::OK);
    let text = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(text.contains("inkcache_http_requests_total"));
}

#[tokio::test]
async fn test_cors_preflight_allows_any_origin() {
    let app = TestApp::new(Arc::new(ScriptedRenderer::new()));
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/svg")
        .header(header::ORIGIN, "https://docs.example.org")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();
    assert_eq!(
        header_str(&response, "access-control-allow-origin"),
        Some("*")
    );
}

// ============================================================================
// PROPERTIES
// ============================================================================

fn test_runtime() -> Result<tokio::runtime::Runtime, TestCaseError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// A stored entry is replayed byte for byte with its own lifetime,
    /// without calling the renderer.
    #[test]
    fn prop_hit_replays_stored_entry(
        source in arb_diagram_source(),
        theme in arb_theme_param(),
        entry in arb_cache_entry(),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let renderer = Arc::new(ScriptedRenderer::new());
            let app = TestApp::new(renderer.clone());
            let url = encode_url(&source, theme.as_deref());
            app.cache.store(&CacheKey::new(url.as_str()), &entry).await.unwrap();

            let response = app.get(&url).await;
            prop_assert_eq!(response.status(), StatusCode::OK);
            prop_assert_eq!(header_str(&response, "x-cache"), Some("HIT"));
            let expected_control = entry.cache_control();
            prop_assert_eq!(
                header_str(&response, "cache-control"),
                Some(expected_control.as_str())
            );
            prop_assert_eq!(body_bytes(response).await, entry.body.clone());
            prop_assert_eq!(renderer.calls(), 0);

            let stats = app.stats().await;
            prop_assert_eq!((stats.hits, stats.misses), (1, 0));
            Ok(())
        })?;
    }

    /// Distinct theme spellings are distinct cache entries even when they
    /// render the same way.
    #[test]
    fn prop_each_url_renders_once(
        source in arb_diagram_source(),
        theme in arb_theme_param(),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let renderer = Arc::new(ScriptedRenderer::new());
            let app = TestApp::new(renderer.clone());
            let url = encode_url(&source, theme.as_deref());

            for _ in 0..3 {
                let response = app.get(&url).await;
                prop_assert_eq!(response.status(), StatusCode::OK);
            }
            prop_assert_eq!(renderer.calls(), 1);
            prop_assert_eq!(app.stats().await.total(), 3);

            let other = format!("{}&theme=other", encode_url(&source, None));
            if other != url {
                app.get(&other).await;
                prop_assert_eq!(renderer.calls(), 2);
            }
            Ok(())
        })?;
    }
}
