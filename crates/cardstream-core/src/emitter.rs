//! Paced delivery of completed items to a sink.
//!
//! [`PacedEmitter`] pulls items one at a time, in whatever order the producer
//! delivers them, and writes each as an event frame. Two consecutive writes
//! start at least `min_interval` apart. The pacing wait happens before a write
//! rather than after it, so the first frame goes out immediately and nothing
//! lingers once the last frame is written.
//!
//! Pacing only ever delays the emitter. The producer keeps completing items
//! into its own queue in the meantime.

use crate::{
    common::{error::Result, types::EmitterConfig},
    frame::encode_frame,
    sink::FrameSink,
};
use serde::Serialize;
use tokio::time::{Instant, sleep_until};
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

/// Why an emission loop stopped without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitEnd {
    /// The producer's stream ended.
    Exhausted,
    /// Cancellation was observed before the stream ended.
    Cancelled,
}

#[derive(Debug)]
pub struct PacedEmitter {
    config: EmitterConfig,
    emitted: u64,
}

impl PacedEmitter {
    pub const fn new(config: EmitterConfig) -> Self {
        Self { config, emitted: 0 }
    }

    /// Frames successfully written so far.
    pub const fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Drains `items` into `sink`, one paced frame per item.
    ///
    /// Cancellation is checked while waiting for the next item, while pacing
    /// and while a write is pending, so no frame is written once `cancel` has
    /// fired.
    ///
    /// # Errors
    ///
    /// - [`Error::SinkClosed`](crate::Error::SinkClosed) as soon as a write
    ///   fails. Nothing is retried.
    /// - [`Error::Encode`](crate::Error::Encode) if an item cannot be
    ///   serialized.
    pub async fn emit<T, S, K>(
        &mut self,
        mut items: S,
        sink: &mut K,
        cancel: &CancellationToken,
    ) -> Result<EmitEnd>
    where
        T: Serialize,
        S: Stream<Item = T> + Unpin,
        K: FrameSink,
    {
        let mut last_write: Option<Instant> = None;

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(EmitEnd::Cancelled),
                next = items.next() => next,
            };
            let Some(item) = next else {
                return Ok(EmitEnd::Exhausted);
            };

            if let Some(last) = last_write {
                if !self.config.min_interval.is_zero() {
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => return Ok(EmitEnd::Cancelled),
                        () = sleep_until(last + self.config.min_interval) => {}
                    }
                }
            }

            let frame = encode_frame(&item)?;
            tracing::trace!(frame = %String::from_utf8_lossy(&frame).trim_end(), "Emitting frame");

            last_write = Some(Instant::now());
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(EmitEnd::Cancelled),
                written = sink.send_frame(frame) => {
                    if let Err(e) = written {
                        tracing::info!(emitted = self.emitted, "Client sink closed");
                        return Err(e);
                    }
                }
            }
            self.emitted += 1;
        }
    }
}

impl Default for PacedEmitter {
    fn default() -> Self {
        Self::new(EmitterConfig::default())
    }
}
