//! INKCACHE API - Render Pipeline and HTTP Surface
//!
//! Serves `/svg` requests carrying a compressed diagram in the URL. Each
//! canonical URL is rendered once through a remote browser; later requests
//! are answered from the cache. Hit and miss counts are kept in a separate
//! stats store and exposed alongside a key listing.

pub mod config;
pub mod constants;
pub mod error;
pub mod jobs;
pub mod macros;
pub mod pipeline;
pub mod routes;
pub mod state;
pub mod stores;
pub mod telemetry;

pub use config::{ApiConfig, StoreBackend};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use jobs::{expiry_sweep_task, BackgroundWriter, WriteJob};
pub use pipeline::{CacheStatus, PipelineError, RenderPipeline, RenderRequest, RenderedResponse};
pub use routes::create_api_router;
pub use state::AppState;
pub use stores::open_stores;
