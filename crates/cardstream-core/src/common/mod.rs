//! Shared types and error definitions used across the streaming core.
//!
//! ## Submodules
//!
//! - [`error`] - Centralized error type used by generation, pooling and
//!   delivery.
//! - [`types`] - Configuration types and their named defaults.

pub mod error;
pub mod types;
