//! Ephemeral just-updated markers.
//!
//! A marker says "this entity changed in the last N milliseconds" and only
//! drives transient visual emphasis, so markers are never persisted. Each
//! marker self-expires on its own schedule; re-marking an entity restarts
//! its clock without touching any other entity's marker.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use medialink_core::time::now_ms;

/// Default marker lifetime in milliseconds.
pub const DEFAULT_MARKER_TTL_MS: u64 = 1_000;

/// Set of per-entity just-updated markers.
#[derive(Clone, Debug)]
pub struct UpdateMarkers {
    entries: Arc<DashMap<String, i64>>,
    ttl_ms: u64,
}

impl UpdateMarkers {
    /// Create a marker set with the given lifetime.
    #[must_use]
    pub fn new(ttl_ms: u64) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl_ms,
        }
    }

    /// Record a marker for `key` and schedule its removal.
    ///
    /// The scheduled removal only fires for the stamp it was created with;
    /// if the entity is re-marked in the meantime the stale timer leaves the
    /// newer marker alone.
    pub fn mark(&self, key: &str) {
        let stamp = now_ms();
        let _ = self.entries.insert(key.to_owned(), stamp);

        let entries = Arc::clone(&self.entries);
        let key = key.to_owned();
        let ttl = Duration::from_millis(self.ttl_ms);
        let _task = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let _ = entries.remove_if(&key, |_, marked_at| *marked_at == stamp);
        });
    }

    /// Whether `key` was marked within the lifetime.
    ///
    /// Checks the stamp age as well as presence, so an entry whose removal
    /// task has not run yet still reads as expired.
    #[must_use]
    pub fn is_recently_updated(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| now_ms() - *entry.value() < self.ttl_ms as i64)
    }

    /// Number of live marker entries (including any awaiting removal).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no markers are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for UpdateMarkers {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER_TTL_MS)
    }
}
