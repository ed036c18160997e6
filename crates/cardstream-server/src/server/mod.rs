//! Server internals.
//!
//! - [`config`] - CLI and environment configuration.
//! - [`service`] - HTTP routes and CORS.
//! - [`streaming`] - per-stream supervision and drain tracking.
//! - [`telemetry`] - log subscriber setup.

pub mod config;
pub mod service;
pub mod streaming;
pub mod telemetry;
