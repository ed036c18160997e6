//! Per-stream supervision and the open-stream gauge.
//!
//! - [`coordinator`] - ties a session to its response body.
//! - [`tracker`] - counts open streams for shutdown draining.

pub mod coordinator;
pub mod tracker;
