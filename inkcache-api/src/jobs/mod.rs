//! Background Jobs for INKCACHE API
//!
//! - `background_writer`: Applies cache stores and stats increments off the
//!   request path
//! - `expiry_sweep`: Periodically deletes expired cache entries
//!
//! # Usage
//!
//! The writer is spawned during server startup and shared through
//! [`AppState`](crate::state::AppState). On shutdown every clone is dropped
//! and the binary awaits the worker handle, bounded by the drain timeout.
//! The expiry sweep is stopped through a `watch` channel.

pub mod background_writer;
pub mod expiry_sweep;

pub use background_writer::{
    BackgroundWriter, BackgroundWriterMetrics, BackgroundWriterSnapshot, WriteJob,
};
pub use expiry_sweep::{expiry_sweep_task, ExpirySweepMetrics, ExpirySweepSnapshot};
