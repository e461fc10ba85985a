//! Named-event handler registry.
//!
//! The raw `on`/`off` surface used by the cache engine and the orchestrator
//! for resource-scoped channels. Multiple independent owners may register
//! the same event name concurrently; each registration gets its own handle
//! and must be torn down by its owner, or the registry retains the handler.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use medialink_core::messages::PushMessage;
use parking_lot::Mutex;

type Handler = Arc<dyn Fn(&PushMessage) + Send + Sync>;

/// One (event name → handler) registration; removes exactly itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

/// Registry of per-event-name message handlers.
#[derive(Default)]
pub struct EventRegistry {
    next_id: AtomicU64,
    handlers: Mutex<HashMap<String, Vec<(u64, Handler)>>>,
}

impl EventRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `event`.
    pub fn on(
        &self,
        event: &str,
        handler: impl Fn(&PushMessage) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers
            .lock()
            .entry(event.to_owned())
            .or_default()
            .push((id, Arc::new(handler)));
        SubscriptionHandle(id)
    }

    /// Remove exactly the handler registered under `handle` for `event`.
    pub fn off(&self, event: &str, handle: SubscriptionHandle) {
        let mut handlers = self.handlers.lock();
        if let Some(list) = handlers.get_mut(event) {
            list.retain(|(id, _)| *id != handle.0);
            if list.is_empty() {
                let _ = handlers.remove(event);
            }
        }
    }

    /// Dispatch a decoded message to every handler registered for `event`.
    ///
    /// Handlers are cloned out of the lock before invocation so a handler
    /// can register or remove subscriptions without deadlocking.
    pub fn dispatch(&self, event: &str, message: &PushMessage) {
        let handlers: Vec<Handler> = self
            .handlers
            .lock()
            .get(event)
            .map(|list| list.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default();
        for handler in handlers {
            handler(message);
        }
    }

    /// Number of handlers registered for `event`.
    #[must_use]
    pub fn handler_count(&self, event: &str) -> usize {
        self.handlers.lock().get(event).map_or(0, Vec::len)
    }
}
