//! # Shared Configuration Types and Constants
//!
//! The values a stream session is parameterized with. Every knob has a named
//! default matching the production route: 5000 records, 100 in flight, one
//! frame every 20ms, 5ms of simulated generation latency.
//!
//! ## Types
//!
//! - [`PoolConfig`] - total work items and the in-flight ceiling
//! - [`EmitterConfig`] - minimum gap between two frame writes
//! - [`GeneratorConfig`] - latency model, locale and optional seed
//! - [`SessionConfig`] - the three above, bundled per session

use crate::{
    catalog::Locale,
    common::error::{Error, Result},
};
use core::{ops::RangeInclusive, time::Duration};

/// Position of a work item in a pool run, assigned at dispatch (`1..=total`).
pub type SequenceId = u64;

/// Records generated per session.
pub const DEFAULT_TOTAL: usize = 5000;

/// Generation tasks allowed in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 100;

/// Minimum delay between the starts of two consecutive frame writes.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(20);

/// Simulated latency of a single generation task.
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(5);

/// Range `listingPrice` is drawn from.
pub const LISTING_PRICE_RANGE: RangeInclusive<u32> = 1..=3000;

/// Range `currentPrice` is drawn from.
pub const CURRENT_PRICE_RANGE: RangeInclusive<u32> = 400..=4000;

/// Size of a pool run and its concurrency ceiling.
///
/// Invariant: `1 <= concurrency <= total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    total: usize,
    concurrency: usize,
}

impl PoolConfig {
    /// Validates and builds a pool configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `total` is zero or `concurrency` is
    /// outside `1..=total`.
    pub fn new(total: usize, concurrency: usize) -> Result<Self> {
        if total == 0 {
            return Err(Error::InvalidConfig {
                reason: "total must be greater than 0".to_string(),
            });
        }
        if concurrency == 0 {
            return Err(Error::InvalidConfig {
                reason: "concurrency must be greater than 0".to_string(),
            });
        }
        if concurrency > total {
            return Err(Error::InvalidConfig {
                reason: format!("concurrency ({concurrency}) exceeds total ({total})"),
            });
        }
        Ok(Self { total, concurrency })
    }

    pub const fn total(&self) -> usize {
        self.total
    }

    pub const fn concurrency(&self) -> usize {
        self.concurrency
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            total: DEFAULT_TOTAL,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Output pacing for the emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitterConfig {
    pub min_interval: Duration,
}

impl EmitterConfig {
    pub const fn new(min_interval: Duration) -> Self {
        Self { min_interval }
    }
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}

/// Latency model and naming for the record generator.
///
/// Each task sleeps `latency + uniform(0..=jitter)` before producing its
/// record. With a `seed`, every task derives its own RNG from the seed and its
/// sequence id so a run is reproducible whatever order tasks complete in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub latency: Duration,
    pub jitter: Duration,
    pub locale: Locale,
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            latency: DEFAULT_LATENCY,
            jitter: Duration::ZERO,
            locale: Locale::default(),
            seed: None,
        }
    }
}

/// Everything a [`StreamSession`](crate::session::StreamSession) needs besides
/// the catalog and the sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionConfig {
    pub pool: PoolConfig,
    pub emitter: EmitterConfig,
    pub generator: GeneratorConfig,
}
