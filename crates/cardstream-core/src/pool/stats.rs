use portable_atomic::{AtomicU64, AtomicUsize, Ordering};

/// Live counters for one pool run.
///
/// Written only by the pool's supervisor task and readable from anywhere, so
/// relaxed ordering is enough: readers want a recent view, not a consistent
/// cut across counters.
#[derive(Debug, Default)]
pub struct PoolStats {
    dispatched: AtomicU64,
    completed: AtomicU64,
    aborted: AtomicU64,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// Point-in-time copy of [`PoolStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub dispatched: u64,
    pub completed: u64,
    pub aborted: u64,
    pub in_flight: usize,
    pub peak_in_flight: usize,
}

impl PoolStats {
    pub(crate) fn record_dispatch(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        let now = self.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::Relaxed);
    }

    pub(crate) fn record_completion(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn record_aborted(&self, count: usize) {
        if count == 0 {
            return;
        }
        self.aborted.fetch_add(count as u64, Ordering::Relaxed);
        self.in_flight.fetch_sub(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            aborted: self.aborted.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
            peak_in_flight: self.peak_in_flight.load(Ordering::Relaxed),
        }
    }
}
