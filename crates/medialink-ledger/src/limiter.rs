//! Admission-control front over the ledger store.
//!
//! Pruning is lazy and read-triggered: every read filters the ledger to the
//! window first, and when that filtering dropped anything the filtered view
//! is persisted back, so the stored slot is self-bounding. There is no
//! locking across check-then-track sequences; racing admissions may both
//! pass, which is acceptable for an advisory client-side limiter.

use std::sync::Arc;

use medialink_core::time::now_ms;

use crate::store::LedgerStore;
use crate::window;

/// Sliding-window rate limiter over a durable ledger slot.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn LedgerStore>,
}

impl RateLimiter {
    /// Create a limiter over the given slot.
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Whether one more action may proceed now.
    #[must_use]
    pub fn can_request(&self, limit: u32, window_ms: i64) -> bool {
        self.can_request_at(limit, window_ms, now_ms())
    }

    /// [`Self::can_request`] at an explicit clock reading.
    #[must_use]
    pub fn can_request_at(&self, limit: u32, window_ms: i64, now: i64) -> bool {
        let ledger = self.pruned(now, window_ms);
        (ledger.len() as u32) < limit
    }

    /// Remaining quota in the current window.
    #[must_use]
    pub fn remaining_requests(&self, limit: u32, window_ms: i64) -> u32 {
        self.remaining_requests_at(limit, window_ms, now_ms())
    }

    /// [`Self::remaining_requests`] at an explicit clock reading.
    #[must_use]
    pub fn remaining_requests_at(&self, limit: u32, window_ms: i64, now: i64) -> u32 {
        let ledger = self.pruned(now, window_ms);
        window::remaining(&ledger, limit, now, window_ms)
    }

    /// Record a successful admission and persist it immediately.
    pub fn track_request(&self) {
        self.track_request_at(now_ms());
    }

    /// [`Self::track_request`] at an explicit clock reading.
    pub fn track_request_at(&self, now: i64) {
        let mut ledger = self.store.load();
        ledger.push(now);
        if let Err(e) = self.store.save(&ledger) {
            tracing::warn!("failed to persist admission ledger: {e}");
        }
    }

    /// When the oldest counted admission leaves the window, or `None` if the
    /// window is empty.
    #[must_use]
    pub fn reset_time(&self, window_ms: i64) -> Option<i64> {
        self.reset_time_at(window_ms, now_ms())
    }

    /// [`Self::reset_time`] at an explicit clock reading.
    #[must_use]
    pub fn reset_time_at(&self, window_ms: i64, now: i64) -> Option<i64> {
        let ledger = self.pruned(now, window_ms);
        window::reset_at(&ledger, now, window_ms)
    }

    /// Load, lazily prune, and write back the pruned view when it shrank.
    fn pruned(&self, now: i64, window_ms: i64) -> Vec<i64> {
        let ledger = self.store.load();
        let pruned = window::prune_window(&ledger, now, window_ms);
        if pruned.len() != ledger.len() {
            if let Err(e) = self.store.save(&pruned) {
                tracing::warn!("failed to persist pruned ledger: {e}");
            }
        }
        pruned
    }
}
