use core::time::Duration;
use portable_atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Gauge of open streams, used to drain them on shutdown.
#[derive(Debug, Default)]
pub struct ActiveStreams {
    count: AtomicUsize,
    idle: Notify,
}

impl ActiveStreams {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Counts a new stream until the returned guard is dropped.
    pub fn enter(self: &Arc<Self>) -> StreamGuard {
        self.count.fetch_add(1, Ordering::AcqRel);
        StreamGuard {
            streams: Arc::clone(self),
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Waits until no stream is open, for at most `timeout`.
    ///
    /// Returns `false` if streams were still open when the timeout elapsed.
    pub async fn drain(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            loop {
                // Registered before the check so a release in between is not
                // missed.
                let idle = self.idle.notified();
                if self.count() == 0 {
                    return;
                }
                idle.await;
            }
        })
        .await
        .is_ok()
    }
}

#[derive(Debug)]
pub struct StreamGuard {
    streams: Arc<ActiveStreams>,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        if self.streams.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.streams.idle.notify_waiters();
        }
    }
}
