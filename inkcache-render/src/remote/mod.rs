//! Remote headless-browser renderer.
//!
//! Talks to a browser-automation service over a small session protocol:
//! open a session, evaluate the diagram in it, close it.

pub mod client;
pub mod types;

pub use client::RemoteBrowserRenderer;
