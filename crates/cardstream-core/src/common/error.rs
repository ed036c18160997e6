//! Error types for the record streaming core.
//!
//! This module defines the central `Error` enum, which captures every failure a
//! stream session can observe. Errors fall in three groups:
//!
//! ## Generation failures (fatal to the session)
//! - `CatalogIndex`: A generation task drew an index outside the catalog.
//! - `MissingName`: The catalog entry has no name for the configured locale.
//! - `TaskFailed`: A generation task panicked or was torn down unexpectedly.
//!
//! ## Delivery failures
//! - `SinkClosed`: The client sink refused a write (typically a disconnect).
//! - `Encode`: A record could not be serialized into a wire frame.
//!
//! ## Setup failures
//! - `CatalogIo` / `CatalogFormat` / `InvalidCatalog`: The catalog could not be
//!   loaded.
//! - `InvalidConfig`: Pool or session parameters violate their bounds.
//!
//! Generation failures are never retried: records are synthetic and there is no
//! transient failure mode to retry against.

use std::io;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for catalog loading, generation and streaming.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A generation task drew an index the catalog cannot answer.
    #[error("Catalog index {index} out of range (size {size})")]
    CatalogIndex { index: usize, size: usize },

    /// The catalog entry exists but carries no name for the locale.
    #[error("Catalog entry {id} has no {locale} name")]
    MissingName { id: u32, locale: &'static str },

    /// A generation task panicked or could not be joined.
    #[error("Generation task failed: {context}")]
    TaskFailed { context: String },

    /// The output sink rejected a write; the client is gone.
    #[error("Sink closed")]
    SinkClosed,

    /// A record could not be serialized.
    #[error("Encode error: {0}")]
    Encode(#[source] serde_json::Error),

    /// The catalog file could not be read.
    #[error("Catalog I/O error: {0}")]
    CatalogIo(#[from] io::Error),

    /// The catalog file is not a valid catalog document.
    #[error("Catalog format error: {0}")]
    CatalogFormat(#[source] serde_json::Error),

    /// The catalog parsed but cannot serve generation.
    #[error("Invalid catalog: {reason}")]
    InvalidCatalog { reason: String },

    /// Pool, emitter or session parameters are out of bounds.
    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },
}

impl Error {
    /// Returns `true` for failures raised by generation tasks.
    ///
    /// These end a session with no error frame: the stream simply stops.
    pub const fn is_generation_failure(&self) -> bool {
        matches!(
            self,
            Self::CatalogIndex { .. } | Self::MissingName { .. } | Self::TaskFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_failures_are_classified() {
        assert!(Error::CatalogIndex { index: 9, size: 2 }.is_generation_failure());
        assert!(
            Error::MissingName {
                id: 1,
                locale: "french"
            }
            .is_generation_failure()
        );
        assert!(
            Error::TaskFailed {
                context: "panic".to_string()
            }
            .is_generation_failure()
        );
        assert!(!Error::SinkClosed.is_generation_failure());
        assert!(
            !Error::InvalidConfig {
                reason: "x".to_string()
            }
            .is_generation_failure()
        );
    }

    #[test]
    fn messages_carry_context() {
        let err = Error::CatalogIndex { index: 7, size: 3 };
        assert_eq!(err.to_string(), "Catalog index 7 out of range (size 3)");
        assert_eq!(Error::SinkClosed.to_string(), "Sink closed");
    }
}
