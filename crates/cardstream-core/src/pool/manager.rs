//! Bounded, refill-on-completion task pool.
//!
//! This module defines [`BoundedTaskPool`], which executes `total` work items
//! with at most `concurrency` of them in flight at once. A supervisor task owns
//! a [`JoinSet`] holding the in-flight window: whenever one task finishes, its
//! output is forwarded to the completion channel and the next sequence id is
//! dispatched in its place, so the window stays saturated until the run is
//! drained.
//!
//! The completion channel is unbounded. Consumers may be slower than the
//! pool (the emitter deliberately is), and that must never throttle
//! generation; `total` bounds how much can queue up.
//!
//! Cancellation and failure both tear the window down through
//! [`JoinSet::shutdown`], which aborts every outstanding task and waits for the
//! aborts to land. No task outlives the [`PoolHandle`].

use super::stats::{PoolSnapshot, PoolStats};
use crate::common::{
    error::{Error, Result},
    types::{PoolConfig, SequenceId},
};
use std::sync::Arc;
use tokio::{
    sync::mpsc,
    task::{JoinError, JoinHandle, JoinSet},
};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

/// Unordered stream of completed work items.
///
/// Yields exactly `total` items on a clean run and ends early on cancellation
/// or failure. Items arrive in completion order, not sequence order.
pub type Completions<T> = UnboundedReceiverStream<T>;

/// Runs up to `concurrency` tasks at a time out of `total`.
#[derive(Debug, Clone, Copy)]
pub struct BoundedTaskPool {
    config: PoolConfig,
}

/// Handle to a running pool.
///
/// Resolves once the supervisor has stopped and every task it dispatched has
/// either completed or been aborted and joined.
#[derive(Debug)]
pub struct PoolHandle {
    task: JoinHandle<Result<PoolSnapshot>>,
    stats: Arc<PoolStats>,
}

impl PoolHandle {
    /// Current counters of the run.
    pub fn stats(&self) -> PoolSnapshot {
        self.stats.snapshot()
    }

    /// The live counters, for observers that outlive this handle.
    pub fn shared_stats(&self) -> Arc<PoolStats> {
        Arc::clone(&self.stats)
    }

    /// Waits for the supervisor to finish.
    ///
    /// # Errors
    ///
    /// Returns the first task failure of the run, or [`Error::TaskFailed`] if
    /// the supervisor itself panicked.
    pub async fn join(self) -> Result<PoolSnapshot> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(task_failed(&e)),
        }
    }
}

impl BoundedTaskPool {
    pub const fn new(config: PoolConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> PoolConfig {
        self.config
    }

    /// Starts the run on the current tokio runtime.
    ///
    /// `work` is called once per sequence id in `1..=total`, in increasing
    /// order, each time a slot in the window frees up. The returned stream
    /// carries the outputs; the handle carries the outcome.
    ///
    /// # Behavior
    ///
    /// - On `cancel`, dispatch stops, in-flight tasks are aborted and the
    ///   stream ends without error.
    /// - If the stream is dropped, the run is torn down the same way.
    /// - A task error or panic aborts its siblings and is returned from
    ///   [`PoolHandle::join`]. There is no retry.
    pub fn spawn<T, F, Fut>(
        &self,
        work: F,
        cancel: CancellationToken,
    ) -> (Completions<T>, PoolHandle)
    where
        T: Send + 'static,
        F: Fn(SequenceId) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let stats = Arc::new(PoolStats::default());
        let task = tokio::spawn(supervise(
            self.config,
            work,
            tx,
            cancel,
            Arc::clone(&stats),
        ));
        (UnboundedReceiverStream::new(rx), PoolHandle { task, stats })
    }
}

async fn supervise<T, F, Fut>(
    config: PoolConfig,
    work: F,
    tx: mpsc::UnboundedSender<T>,
    cancel: CancellationToken,
    stats: Arc<PoolStats>,
) -> Result<PoolSnapshot>
where
    T: Send + 'static,
    F: Fn(SequenceId) -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let total = config.total() as SequenceId;
    let mut in_flight: JoinSet<Result<T>> = JoinSet::new();
    let mut next: SequenceId = 1;

    tracing::debug!(
        total,
        concurrency = config.concurrency(),
        "Pool run started"
    );

    loop {
        // Refill the window.
        while in_flight.len() < config.concurrency() && next <= total && !cancel.is_cancelled() {
            in_flight.spawn(work(next));
            stats.record_dispatch();
            next += 1;
        }

        if in_flight.is_empty() {
            break;
        }

        let joined = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!(outstanding = in_flight.len(), "Pool run cancelled");
                abort_window(&mut in_flight, &stats).await;
                return Ok(stats.snapshot());
            }
            joined = in_flight.join_next() => joined,
        };

        let Some(joined) = joined else {
            break;
        };
        stats.record_completion();

        match joined {
            Ok(Ok(item)) => {
                if tx.send(item).is_err() {
                    tracing::debug!("Completion stream dropped, stopping pool");
                    abort_window(&mut in_flight, &stats).await;
                    return Ok(stats.snapshot());
                }
            }
            Ok(Err(e)) => {
                tracing::error!("Generation task failed: {e}");
                abort_window(&mut in_flight, &stats).await;
                return Err(e);
            }
            Err(e) => {
                tracing::error!("Generation task did not complete: {e}");
                abort_window(&mut in_flight, &stats).await;
                return Err(task_failed(&e));
            }
        }
    }

    let snapshot = stats.snapshot();
    tracing::debug!(completed = snapshot.completed, "Pool run drained");
    Ok(snapshot)
}

async fn abort_window<T: 'static>(in_flight: &mut JoinSet<Result<T>>, stats: &PoolStats) {
    let outstanding = in_flight.len();
    in_flight.shutdown().await;
    stats.record_aborted(outstanding);
}

fn task_failed(e: &JoinError) -> Error {
    let context = if e.is_panic() {
        "task panicked".to_string()
    } else {
        e.to_string()
    };
    Error::TaskFailed { context }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use portable_atomic::{AtomicUsize, Ordering};
    use std::collections::HashSet;
    use tokio_stream::StreamExt;

    /// Tracks how many work items are running right now and the most ever
    /// seen at once.
    #[derive(Default)]
    struct Gauge {
        live: AtomicUsize,
        peak: AtomicUsize,
    }

    // Decrements on drop so aborted tasks are counted out too.
    struct Live<'a>(&'a AtomicUsize);

    impl Drop for Live<'_> {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl Gauge {
        async fn run(&self, id: SequenceId, delay: Duration) -> SequenceId {
            let now = self.live.fetch_add(1, Ordering::SeqCst) + 1;
            let _live = Live(&self.live);
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            id
        }
    }

    fn instrumented(
        gauge: &Arc<Gauge>,
    ) -> impl Fn(SequenceId) -> std::pin::Pin<Box<dyn Future<Output = Result<SequenceId>> + Send>>
    + Send
    + 'static {
        let gauge = Arc::clone(gauge);
        move |id| {
            let gauge = Arc::clone(&gauge);
            // Vary latency so completion order differs from dispatch order.
            let delay = Duration::from_millis((id * 7 % 5) + 1);
            Box::pin(async move { Ok::<_, Error>(gauge.run(id, delay).await) })
        }
    }

    async fn run_to_end(total: usize, concurrency: usize) {
        let gauge = Arc::new(Gauge::default());
        let pool = BoundedTaskPool::new(PoolConfig::new(total, concurrency).unwrap());
        let (completions, handle) = pool.spawn(instrumented(&gauge), CancellationToken::new());

        let ids: Vec<SequenceId> = completions.collect().await;
        let snapshot = handle.join().await.unwrap();

        assert_eq!(ids.len(), total);
        let unique: HashSet<_> = ids.iter().copied().collect();
        assert_eq!(unique, (1..=total as SequenceId).collect::<HashSet<_>>());
        assert!(gauge.peak.load(Ordering::SeqCst) <= concurrency);
        assert!(snapshot.peak_in_flight <= concurrency);
        assert_eq!(snapshot.dispatched, total as u64);
        assert_eq!(snapshot.completed, total as u64);
        assert_eq!(snapshot.in_flight, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn yields_every_id_once_within_the_ceiling() {
        for (total, concurrency) in [(1, 1), (10, 1), (10, 3), (10, 10), (257, 16)] {
            run_to_end(total, concurrency).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_the_window_saturated() {
        let gauge = Arc::new(Gauge::default());
        let pool = BoundedTaskPool::new(PoolConfig::new(50, 5).unwrap());
        let (completions, handle) = pool.spawn(instrumented(&gauge), CancellationToken::new());
        let _: Vec<_> = completions.collect().await;
        handle.join().await.unwrap();
        assert_eq!(gauge.peak.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_ends_stream_and_aborts_window() {
        let gauge = Arc::new(Gauge::default());
        let cancel = CancellationToken::new();
        let pool = BoundedTaskPool::new(PoolConfig::new(1000, 10).unwrap());
        let (mut completions, handle) = pool.spawn(instrumented(&gauge), cancel.clone());

        for _ in 0..15 {
            completions.next().await.unwrap();
        }
        cancel.cancel();

        let snapshot = handle.join().await.unwrap();
        assert!(snapshot.dispatched < 1000);
        assert_eq!(snapshot.in_flight, 0);
        assert!(snapshot.aborted > 0);
        // Aborted tasks were dropped mid-sleep, so nothing is still running.
        assert_eq!(gauge.live.load(Ordering::SeqCst), 0);

        let rest: Vec<_> = completions.collect().await;
        assert!(rest.len() + 15 < 1000);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_stream_stops_the_pool() {
        let gauge = Arc::new(Gauge::default());
        let pool = BoundedTaskPool::new(PoolConfig::new(1000, 4).unwrap());
        let (completions, handle) = pool.spawn(instrumented(&gauge), CancellationToken::new());
        drop(completions);

        let snapshot = handle.join().await.unwrap();
        assert!(snapshot.completed < 1000);
        assert_eq!(snapshot.in_flight, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn first_failure_is_fatal() {
        let pool = BoundedTaskPool::new(PoolConfig::new(100, 4).unwrap());
        let work = |id: SequenceId| async move {
            tokio::time::sleep(Duration::from_millis(1)).await;
            if id == 6 {
                Err(Error::CatalogIndex { index: 99, size: 2 })
            } else {
                Ok::<_, Error>(id)
            }
        };
        let (completions, handle) = pool.spawn(work, CancellationToken::new());
        let ids: Vec<_> = completions.collect().await;

        let err = handle.join().await.unwrap_err();
        assert!(matches!(err, Error::CatalogIndex { index: 99, .. }));
        assert!(ids.len() < 100);
        assert!(!ids.contains(&6));
    }

    #[tokio::test]
    async fn panicking_task_is_reported_as_task_failure() {
        let pool = BoundedTaskPool::new(PoolConfig::new(3, 1).unwrap());
        let work = |id: SequenceId| async move {
            assert_ne!(id, 2, "boom");
            Ok::<_, Error>(id)
        };
        let (completions, handle) = pool.spawn(work, CancellationToken::new());
        let ids: Vec<_> = completions.collect().await;

        assert_eq!(ids, vec![1]);
        assert!(matches!(
            handle.join().await,
            Err(Error::TaskFailed { .. })
        ));
    }

    #[tokio::test]
    async fn pre_cancelled_pool_dispatches_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let pool = BoundedTaskPool::new(PoolConfig::new(10, 2).unwrap());
        let (completions, handle) =
            pool.spawn(|id: SequenceId| async move { Ok::<_, Error>(id) }, cancel);

        let ids: Vec<_> = completions.collect().await;
        assert!(ids.is_empty());
        assert_eq!(handle.join().await.unwrap().dispatched, 0);
    }
}
