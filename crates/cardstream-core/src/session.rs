//! One client's stream, from open to close.
//!
//! A [`StreamSession`] owns a [`BoundedTaskPool`] generating records and a
//! [`PacedEmitter`] writing them to the client's sink. Both run inside a driver
//! task spawned by [`StreamSession::open`] and share a single
//! [`CancellationToken`]:
//!
//! - the HTTP layer cancels it when the connection goes away,
//! - the emitter's failure (sink closed) cancels it to stop generation,
//! - a generation failure cancels it to stop emission,
//! - server shutdown cancels it through the parent token.
//!
//! ## Lifecycle
//!
//! ```text
//! Active ──(all records emitted)──────────────────────────────────▶ Closed
//!    └──(cancel / disconnect / failure / shutdown)──▶ Draining ──▶ Closed
//! ```
//!
//! A session whose token has fired, including through a parent token, reports
//! `Draining` from that moment on. `Draining` lasts until the pool has aborted
//! and joined every in-flight task and the sink has been dropped.
//! [`StreamSession::wait`] only returns once the session is `Closed`.

use crate::{
    catalog::Catalog,
    common::{error::Error, types::SessionConfig},
    emitter::{EmitEnd, PacedEmitter},
    generator::RecordGenerator,
    pool::{BoundedTaskPool, PoolSnapshot},
    sink::FrameSink,
};
use core::fmt;
use portable_atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Active = 0,
    Draining = 1,
    Closed = 2,
}

impl SessionState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Active,
            1 => Self::Draining,
            _ => Self::Closed,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Draining => f.write_str("draining"),
            Self::Closed => f.write_str("closed"),
        }
    }
}

#[derive(Debug)]
struct Lifecycle(AtomicU8);

impl Lifecycle {
    const fn new() -> Self {
        Self(AtomicU8::new(SessionState::Active as u8))
    }

    fn get(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::Acquire))
    }

    // Only an active session can start draining; later calls are no-ops.
    fn begin_drain(&self) -> bool {
        self.0
            .compare_exchange(
                SessionState::Active as u8,
                SessionState::Draining as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Returns the state the session closed from.
    fn close(&self) -> SessionState {
        SessionState::from_u8(self.0.swap(SessionState::Closed as u8, Ordering::AcqRel))
    }
}

/// How a session ended.
#[derive(Debug)]
pub enum Termination {
    /// Every record was generated and written.
    Completed,
    /// Cancelled by the client, the caller or server shutdown.
    Cancelled,
    /// The sink rejected a write; the client is gone.
    SinkClosed,
    /// A generation task failed, or a record could not be encoded.
    Failed(Error),
}

impl Termination {
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Outcome of a closed session.
#[derive(Debug)]
pub struct SessionReport {
    pub termination: Termination,
    /// Frames successfully written to the sink.
    pub emitted: u64,
    /// Final pool counters.
    pub pool: PoolSnapshot,
    /// Whether the session went through `Draining` before closing, which is
    /// the case for every ending except a clean completion.
    pub drained: bool,
}

/// Cloneable cancel handle for a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    cancel: CancellationToken,
    lifecycle: Arc<Lifecycle>,
}

impl SessionHandle {
    /// Requests cancellation.
    ///
    /// Idempotent and safe to race with normal completion: only the first call
    /// on an active session moves it to `Draining`, every other call only
    /// re-fires an already fired token.
    pub fn cancel(&self) {
        self.mark_draining();
        self.cancel.cancel();
    }

    /// Current lifecycle state.
    ///
    /// A session whose token has fired is never reported `Active`, whichever
    /// token fired it: its own, or a parent's.
    pub fn state(&self) -> SessionState {
        match self.lifecycle.get() {
            SessionState::Active if self.cancel.is_cancelled() => SessionState::Draining,
            state => state,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn mark_draining(&self) {
        if self.lifecycle.begin_drain() {
            tracing::debug!("Session draining");
        }
    }
}

/// A running stream for one client.
///
/// Dropping a session without calling [`StreamSession::wait`] cancels it.
#[derive(Debug)]
pub struct StreamSession {
    handle: SessionHandle,
    driver: Option<JoinHandle<SessionReport>>,
}

impl StreamSession {
    /// Starts generating and emitting records into `sink`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open<K>(catalog: Arc<Catalog>, config: SessionConfig, sink: K) -> Self
    where
        K: FrameSink + 'static,
    {
        Self::open_with_token(catalog, config, sink, &CancellationToken::new())
    }

    /// Like [`StreamSession::open`], but the session is also cancelled when
    /// `parent` is.
    pub fn open_with_token<K>(
        catalog: Arc<Catalog>,
        config: SessionConfig,
        sink: K,
        parent: &CancellationToken,
    ) -> Self
    where
        K: FrameSink + 'static,
    {
        let handle = SessionHandle {
            cancel: parent.child_token(),
            lifecycle: Arc::new(Lifecycle::new()),
        };

        tracing::debug!(
            total = config.pool.total(),
            concurrency = config.pool.concurrency(),
            min_interval_ms = config.emitter.min_interval.as_millis() as u64,
            "Session opened"
        );

        let driver = tokio::spawn(drive(catalog, config, sink, handle.clone()));
        Self {
            handle,
            driver: Some(driver),
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn cancel(&self) {
        self.handle.cancel();
    }

    pub fn state(&self) -> SessionState {
        self.handle.state()
    }

    /// Waits until the session is `Closed` and every task it started has
    /// stopped.
    pub async fn wait(mut self) -> SessionReport {
        let Some(driver) = self.driver.take() else {
            unreachable!("driver is only taken by wait, which consumes the session");
        };

        match driver.await {
            Ok(report) => report,
            Err(e) => {
                let drained = self.handle.lifecycle.close() == SessionState::Draining;
                tracing::error!("Session driver did not complete: {e}");
                SessionReport {
                    termination: Termination::Failed(Error::TaskFailed {
                        context: e.to_string(),
                    }),
                    emitted: 0,
                    pool: PoolSnapshot::default(),
                    drained,
                }
            }
        }
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        if self.driver.is_some() {
            self.handle.cancel();
        }
    }
}

async fn drive<K>(
    catalog: Arc<Catalog>,
    config: SessionConfig,
    mut sink: K,
    handle: SessionHandle,
) -> SessionReport
where
    K: FrameSink,
{
    let cancel = handle.cancel.clone();
    let generator = RecordGenerator::new(catalog, config.generator);
    let pool = BoundedTaskPool::new(config.pool);

    let (records, pool_handle) = pool.spawn(
        move |sequence_id| {
            let generator = generator.clone();
            async move { generator.generate(sequence_id).await }
        },
        cancel.clone(),
    );
    let pool_stats = pool_handle.shared_stats();

    let mut emitter = PacedEmitter::new(config.emitter);
    let emission = async {
        let result = emitter.emit(records, &mut sink, &cancel).await;
        if result.is_err() {
            handle.cancel();
        }
        result
    };
    let generation = async {
        let result = pool_handle.join().await;
        if result.is_err() {
            handle.cancel();
        }
        result
    };

    // Cancellation may come from the handle, a failure on either side, or the
    // parent token. All of them drain before closing.
    let (emitted_result, pool_result) = {
        let work = async { tokio::join!(emission, generation) };
        tokio::pin!(work);
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                handle.mark_draining();
                work.await
            }
            results = &mut work => results,
        }
    };
    drop(sink);

    let emitted = emitter.emitted();
    let termination = match (pool_result, emitted_result) {
        (Err(e), _) => Termination::Failed(e),
        (Ok(_), Err(Error::SinkClosed)) => Termination::SinkClosed,
        (Ok(_), Err(e)) => Termination::Failed(e),
        (Ok(_), Ok(EmitEnd::Exhausted)) if emitted == config.pool.total() as u64 => {
            Termination::Completed
        }
        (Ok(_), Ok(_)) => Termination::Cancelled,
    };

    match &termination {
        Termination::Completed => tracing::info!(emitted, "Session completed"),
        Termination::Cancelled => tracing::info!(emitted, "Session cancelled"),
        Termination::SinkClosed => tracing::info!(emitted, "Client disconnected from stream"),
        Termination::Failed(e) => tracing::error!(emitted, "Session failed: {e}"),
    }

    let drained = handle.lifecycle.close() == SessionState::Draining;
    SessionReport {
        termination,
        emitted,
        pool: pool_stats.snapshot(),
        drained,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_only_drains_from_active() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.get(), SessionState::Active);
        assert!(lifecycle.begin_drain());
        assert!(!lifecycle.begin_drain());
        assert_eq!(lifecycle.get(), SessionState::Draining);
        assert_eq!(lifecycle.close(), SessionState::Draining);
        assert!(!lifecycle.begin_drain());
        assert_eq!(lifecycle.get(), SessionState::Closed);
    }

    #[test]
    fn fired_token_reports_draining_before_driver_notices() {
        let parent = CancellationToken::new();
        let handle = SessionHandle {
            cancel: parent.child_token(),
            lifecycle: Arc::new(Lifecycle::new()),
        };
        assert_eq!(handle.state(), SessionState::Active);

        parent.cancel();
        assert!(handle.is_cancelled());
        assert_eq!(handle.state(), SessionState::Draining);

        assert_eq!(handle.lifecycle.close(), SessionState::Active);
        assert_eq!(handle.state(), SessionState::Closed);
    }

    #[test]
    fn state_displays_lowercase() {
        assert_eq!(SessionState::Draining.to_string(), "draining");
    }
}
