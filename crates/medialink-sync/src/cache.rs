//! The shared keyed collection contract and an in-memory implementation.
//!
//! UI layers read records out of the collection and re-render when entries
//! change; this crate only applies patches. The backing storage is owned by
//! whoever constructs the client, so the contract is a trait.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

/// A keyed collection of JSON records.
pub trait KeyedCache: Send + Sync {
    /// Read one record.
    fn get(&self, key: &str) -> Option<Value>;

    /// Shallow-merge `partial` over the record at `key`, inserting a new
    /// record from `partial` alone when none exists. Keys present in
    /// `partial` overwrite; absent keys are untouched.
    fn set_patch(&self, key: &str, partial: Value);

    /// Drop every record whose key starts with `key_prefix`, forcing
    /// downstream refetch.
    fn invalidate(&self, key_prefix: &str);
}

/// In-memory keyed collection.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, Value>,
}

impl MemoryCache {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty collection behind an `Arc`.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of records held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys currently held under a prefix, in no particular order.
    #[must_use]
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect()
    }
}

impl KeyedCache for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn set_patch(&self, key: &str, partial: Value) {
        let mut slot = self.entries.entry(key.to_owned()).or_insert(Value::Null);
        match (slot.value_mut(), partial) {
            (Value::Object(existing), Value::Object(patch)) => {
                for (field, value) in patch {
                    let _ = existing.insert(field, value);
                }
            }
            (slot_value, partial) => *slot_value = partial,
        }
    }

    fn invalidate(&self, key_prefix: &str) {
        self.entries.retain(|key, _| !key.starts_with(key_prefix));
    }
}
