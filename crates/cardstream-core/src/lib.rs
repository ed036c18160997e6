#![doc = include_str!("../README.md")]

pub mod catalog;
mod common;
pub mod emitter;
pub mod frame;
pub mod generator;
pub mod pool;
pub mod record;
pub mod session;
pub mod sink;

pub use catalog::{Catalog, CatalogEntry, Locale};
pub use common::*;
pub use common::{
    error::{Error, Result},
    types::{
        CURRENT_PRICE_RANGE, DEFAULT_CONCURRENCY, DEFAULT_LATENCY, DEFAULT_MIN_INTERVAL,
        DEFAULT_TOTAL, EmitterConfig, GeneratorConfig, LISTING_PRICE_RANGE, PoolConfig,
        SequenceId, SessionConfig,
    },
};
pub use emitter::{EmitEnd, PacedEmitter};
pub use frame::{EVENT_STREAM_HEADERS, encode_frame};
pub use generator::RecordGenerator;
pub use pool::{BoundedTaskPool, Completions, PoolHandle, PoolSnapshot, PoolStats};
pub use record::Record;
pub use session::{SessionHandle, SessionReport, SessionState, StreamSession, Termination};
pub use sink::{ChannelSink, FrameSink};
