//! Bounded-concurrency execution of a fixed batch of work items.
//!
//! ## Structure
//!
//! - [`manager`] - [`BoundedTaskPool`] and its supervisor loop.
//! - [`stats`] - Atomic progress counters shared with observers.

pub mod manager;
pub mod stats;

pub use manager::{BoundedTaskPool, Completions, PoolHandle};
pub use stats::{PoolSnapshot, PoolStats};
