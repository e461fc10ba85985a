//! Tagged registry of connection-state observers.
//!
//! Each registration gets its own tag; removal is exact, so registering the
//! same closure twice yields two independent deliveries and removing one
//! leaves the other in place.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use medialink_core::state::ConnectionState;
use parking_lot::Mutex;

type Observer = Arc<dyn Fn(&ConnectionState) + Send + Sync>;

/// Tag returned by [`StateObservers::add`]; removes exactly that observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Registry of state-snapshot observers.
#[derive(Default)]
pub struct StateObservers {
    next_id: AtomicU64,
    observers: Mutex<Vec<(u64, Observer)>>,
}

impl StateObservers {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer for every subsequent snapshot.
    pub fn add(&self, observer: impl Fn(&ConnectionState) + Send + Sync + 'static) -> ObserverId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.observers.lock().push((id, Arc::new(observer)));
        ObserverId(id)
    }

    /// Remove exactly the observer registered under `id`.
    ///
    /// Removing an already-removed id is a no-op.
    pub fn remove(&self, id: ObserverId) {
        self.observers.lock().retain(|(tag, _)| *tag != id.0);
    }

    /// Deliver a snapshot to every registered observer, in registration
    /// order. Observers receive a shared reference to an immutable snapshot
    /// and clone what they keep.
    ///
    /// Observers are cloned out of the lock before invocation so an
    /// observer can register or remove observers without deadlocking.
    pub fn notify(&self, state: &ConnectionState) {
        let observers: Vec<Observer> = self
            .observers
            .lock()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();
        for observer in observers {
            observer(state);
        }
    }

    /// Number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.lock().len()
    }

    /// Whether no observers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.lock().is_empty()
    }
}
