//! Lock-free counters describing what the bridge did with each update.

use std::sync::atomic::{AtomicU64, Ordering};

/// Running totals, updated from the feed thread.
#[derive(Debug, Default)]
pub struct BridgeStats {
    dispatched: AtomicU64,
    filtered: AtomicU64,
    accepted: AtomicU64,
    rejected: AtomicU64,
    dropped: AtomicU64,
    reconnects: AtomicU64,
}

impl BridgeStats {
    pub(crate) fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_filtered(&self) {
        self.filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn set_reconnects(&self, total: u64) {
        self.reconnects.store(total, Ordering::Relaxed);
    }

    /// Copies the current totals.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`BridgeStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Events received from the feed.
    pub dispatched: u64,
    /// Events skipped by the family filter.
    pub filtered: u64,
    /// Commands the daemon acknowledged.
    pub accepted: u64,
    /// Commands the daemon refused.
    pub rejected: u64,
    /// Events lost to formatting, transport or shutdown.
    pub dropped: u64,
    /// Successful reconnects to the daemon.
    pub reconnects: u64,
}
