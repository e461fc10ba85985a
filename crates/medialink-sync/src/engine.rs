//! Cache synchronization engine.
//!
//! Applies push updates onto the shared keyed collection under two message
//! shapes with deliberately different failure policies:
//!
//! - a **single-entity** update merges only the fields present in the
//!   message; anything malformed degrades to a best-effort partial merge
//!   and the existing record stays visible
//! - a **bulk** update wholesale-replaces the kind's slice; a malformed
//!   bulk payload is a no-op rather than a wipe
//!
//! Both paths normalize date-like wire fields to RFC 3339 UTC and stamp the
//! patch with a `syncedAt` timestamp. Updates are applied in arrival order,
//! so a later message always wins for the same field.

use std::sync::Arc;

use medialink_core::messages::{EntityUpdate, PushMessage};
use medialink_core::time::{normalize_timestamp, now_rfc3339};
use serde_json::{Map, Value};
use tracing::debug;

use crate::cache::KeyedCache;
use crate::markers::UpdateMarkers;

/// Resource kinds held in the shared collection.
pub mod kind {
    /// Monitored service-health records.
    pub const SERVICE: &str = "service";
    /// Media-request records.
    pub const REQUEST: &str = "request";
}

/// Collection key for an entity: `<kind>:<id>`.
#[must_use]
pub fn cache_key(kind: &str, id: &str) -> String {
    format!("{kind}:{id}")
}

/// Merges push updates into the shared collection and tracks just-updated
/// markers.
pub struct CacheEngine {
    cache: Arc<dyn KeyedCache>,
    markers: UpdateMarkers,
}

impl CacheEngine {
    /// Create an engine over the given collection.
    #[must_use]
    pub fn new(cache: Arc<dyn KeyedCache>, markers: UpdateMarkers) -> Self {
        Self { cache, markers }
    }

    /// Route one decoded push message.
    pub fn apply(&self, message: &PushMessage) {
        match message {
            PushMessage::ServiceStatus(update) => {
                self.apply_single_update(kind::SERVICE, update);
            }
            PushMessage::ServiceList(entries) => {
                self.apply_bulk_update(kind::SERVICE, entries);
            }
            PushMessage::RequestStatus(update) => {
                self.apply_single_update(kind::REQUEST, update);
            }
            PushMessage::RequestList(entries) => {
                self.apply_bulk_update(kind::REQUEST, entries);
            }
            PushMessage::ConnectionStatus(_)
            | PushMessage::Subscribed(_)
            | PushMessage::Unsubscribed(_) => {}
        }
    }

    /// Merge one entity's fields over its record, inserting the record when
    /// it does not exist yet. Null field values are skipped, preserving
    /// whatever the record already holds.
    pub fn apply_single_update(&self, kind: &str, update: &EntityUpdate) {
        let key = cache_key(kind, &update.id);
        let patch = normalized_patch(&update.fields, true);
        debug!(%key, fields = patch.len(), "applying single update");
        self.cache.set_patch(&key, Value::Object(patch));
        self.markers.mark(&key);
    }

    /// Replace the kind's entire slice of the collection with `entries`.
    /// Entries without a usable id are skipped.
    pub fn apply_bulk_update(&self, kind: &str, entries: &[Map<String, Value>]) {
        let prefix = format!("{kind}:");
        debug!(kind, count = entries.len(), "applying bulk update");
        self.cache.invalidate(&prefix);
        for entry in entries {
            let Some(update) = EntityUpdate::from_object(entry) else {
                debug!(kind, "skipping bulk entry without id");
                continue;
            };
            let key = cache_key(kind, &update.id);
            let record = normalized_patch(&update.fields, false);
            self.cache.set_patch(&key, Value::Object(record));
        }
    }

    /// Record a just-updated marker for an entity.
    pub fn mark_updated(&self, kind: &str, id: &str) {
        self.markers.mark(&cache_key(kind, id));
    }

    /// Whether an entity's marker is still live.
    #[must_use]
    pub fn is_recently_updated(&self, kind: &str, id: &str) -> bool {
        self.markers.is_recently_updated(&cache_key(kind, id))
    }
}

/// Build the patch actually applied: present fields with date-like values
/// normalized, plus the `syncedAt` stamp. When `skip_nulls` is set, null
/// values are dropped from the patch so they cannot erase existing fields.
fn normalized_patch(fields: &Map<String, Value>, skip_nulls: bool) -> Map<String, Value> {
    let mut patch = Map::new();
    for (field, value) in fields {
        if skip_nulls && value.is_null() {
            continue;
        }
        let normalized = if field.ends_with("At") {
            normalize_timestamp(value).map_or_else(|| value.clone(), Value::String)
        } else {
            value.clone()
        };
        let _ = patch.insert(field.clone(), normalized);
    }
    let _ = patch.insert("syncedAt".to_owned(), Value::String(now_rfc3339()));
    patch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use medialink_core::messages::Envelope;

    fn engine() -> (CacheEngine, Arc<MemoryCache>) {
        let cache = MemoryCache::shared();
        let engine = CacheEngine::new(cache.clone(), UpdateMarkers::new(1_000));
        (engine, cache)
    }

    fn update(id: &str, fields: Value) -> EntityUpdate {
        let mut object = fields.as_object().unwrap().clone();
        let _ = object.insert("id".to_owned(), Value::String(id.to_owned()));
        EntityUpdate::from_object(&object).unwrap()
    }

    #[tokio::test]
    async fn single_update_inserts_missing_record() {
        let (engine, cache) = engine();
        engine.apply_single_update(
            kind::SERVICE,
            &update("svc_1", serde_json::json!({"name": "plex", "status": "up"})),
        );

        let record = cache.get("service:svc_1").unwrap();
        assert_eq!(record["name"], "plex");
        assert_eq!(record["status"], "up");
        assert!(record["syncedAt"].is_string());
    }

    #[tokio::test]
    async fn single_update_preserves_absent_fields() {
        let (engine, cache) = engine();
        engine.apply_single_update(
            kind::SERVICE,
            &update(
                "svc_1",
                serde_json::json!({"name": "plex", "status": "up", "latency": 20}),
            ),
        );
        engine.apply_single_update(
            kind::SERVICE,
            &update("svc_1", serde_json::json!({"status": "down"})),
        );

        let record = cache.get("service:svc_1").unwrap();
        assert_eq!(record["status"], "down");
        assert_eq!(record["name"], "plex");
        assert_eq!(record["latency"], 20);
    }

    #[tokio::test]
    async fn single_update_with_no_fields_changes_nothing_else() {
        let (engine, cache) = engine();
        engine.apply_single_update(
            kind::SERVICE,
            &update("svc_1", serde_json::json!({"name": "plex", "status": "up"})),
        );
        engine.apply_single_update(kind::SERVICE, &update("svc_1", serde_json::json!({})));

        let record = cache.get("service:svc_1").unwrap();
        assert_eq!(record["name"], "plex");
        assert_eq!(record["status"], "up");
    }

    #[tokio::test]
    async fn single_update_skips_null_fields() {
        let (engine, cache) = engine();
        engine.apply_single_update(
            kind::SERVICE,
            &update("svc_1", serde_json::json!({"name": "plex"})),
        );
        engine.apply_single_update(
            kind::SERVICE,
            &update("svc_1", serde_json::json!({"name": null, "status": "up"})),
        );

        let record = cache.get("service:svc_1").unwrap();
        assert_eq!(record["name"], "plex");
        assert_eq!(record["status"], "up");
    }

    #[tokio::test]
    async fn single_update_is_idempotent() {
        let (engine, cache) = engine();
        let fields = serde_json::json!({"status": "up", "latency": 20});
        engine.apply_single_update(kind::SERVICE, &update("svc_1", fields.clone()));
        let first = cache.get("service:svc_1").unwrap();
        engine.apply_single_update(kind::SERVICE, &update("svc_1", fields));
        let second = cache.get("service:svc_1").unwrap();

        // Identical except for the sync stamp, which only moves forward.
        let strip = |mut v: Value| {
            let _ = v.as_object_mut().unwrap().remove("syncedAt");
            v
        };
        assert_eq!(strip(first), strip(second));
    }

    #[tokio::test]
    async fn single_update_normalizes_date_fields() {
        let (engine, cache) = engine();
        engine.apply_single_update(
            kind::SERVICE,
            &update(
                "svc_1",
                serde_json::json!({
                    "lastCheckedAt": 1_700_000_000_000_i64,
                    "status": "up",
                }),
            ),
        );

        let record = cache.get("service:svc_1").unwrap();
        let checked = record["lastCheckedAt"].as_str().unwrap();
        assert!(checked.starts_with("2023-11-14T"));
        assert!(checked.ends_with('Z'));
    }

    #[tokio::test]
    async fn unparseable_date_field_passes_through() {
        let (engine, cache) = engine();
        engine.apply_single_update(
            kind::SERVICE,
            &update("svc_1", serde_json::json!({"lastCheckedAt": "soon"})),
        );
        let record = cache.get("service:svc_1").unwrap();
        assert_eq!(record["lastCheckedAt"], "soon");
    }

    #[tokio::test]
    async fn single_update_marks_entity() {
        let (engine, _cache) = engine();
        engine.apply_single_update(
            kind::REQUEST,
            &update("req_1", serde_json::json!({"status": "available"})),
        );
        assert!(engine.is_recently_updated(kind::REQUEST, "req_1"));
        assert!(!engine.is_recently_updated(kind::REQUEST, "req_2"));
    }

    #[tokio::test]
    async fn bulk_update_replaces_the_slice() {
        let (engine, cache) = engine();
        engine.apply_single_update(
            kind::SERVICE,
            &update("svc_old", serde_json::json!({"status": "up"})),
        );

        let entries: Vec<Map<String, Value>> = vec![
            serde_json::json!({"id": "svc_1", "status": "up"})
                .as_object()
                .unwrap()
                .clone(),
            serde_json::json!({"id": "svc_2", "status": "down"})
                .as_object()
                .unwrap()
                .clone(),
        ];
        engine.apply_bulk_update(kind::SERVICE, &entries);

        let mut keys = cache.keys_with_prefix("service:");
        keys.sort();
        assert_eq!(keys, vec!["service:svc_1", "service:svc_2"]);
        assert!(cache.get("service:svc_old").is_none());
    }

    #[tokio::test]
    async fn bulk_update_does_not_touch_other_kinds() {
        let (engine, cache) = engine();
        engine.apply_single_update(
            kind::REQUEST,
            &update("req_1", serde_json::json!({"status": "pending"})),
        );
        engine.apply_bulk_update(
            kind::SERVICE,
            &[serde_json::json!({"id": "svc_1"}).as_object().unwrap().clone()],
        );
        assert!(cache.get("request:req_1").is_some());
    }

    #[tokio::test]
    async fn bulk_update_skips_entries_without_id() {
        let (engine, cache) = engine();
        let entries: Vec<Map<String, Value>> = vec![
            serde_json::json!({"status": "up"}).as_object().unwrap().clone(),
            serde_json::json!({"id": "svc_1", "status": "up"})
                .as_object()
                .unwrap()
                .clone(),
        ];
        engine.apply_bulk_update(kind::SERVICE, &entries);
        assert_eq!(cache.keys_with_prefix("service:").len(), 1);
    }

    #[tokio::test]
    async fn bulk_update_normalizes_each_entry() {
        let (engine, cache) = engine();
        engine.apply_bulk_update(
            kind::SERVICE,
            &[serde_json::json!({"id": "svc_1", "lastCheckedAt": "2026-01-15T10:30:00+02:00"})
                .as_object()
                .unwrap()
                .clone()],
        );
        let record = cache.get("service:svc_1").unwrap();
        assert_eq!(record["lastCheckedAt"], "2026-01-15T08:30:00.000Z");
    }

    #[tokio::test]
    async fn malformed_bulk_payload_is_noop_via_decode() {
        // A null / non-list payload never reaches the engine: the boundary
        // decode rejects it, so the collection keeps its contents.
        let (engine, cache) = engine();
        engine.apply_single_update(
            kind::SERVICE,
            &update("svc_1", serde_json::json!({"status": "up"})),
        );

        let env = Envelope::new("service:status", Some(Value::Null));
        assert!(PushMessage::decode(&env).is_none());
        let env = Envelope::new("service:status", Some(serde_json::json!(42)));
        assert!(PushMessage::decode(&env).is_none());

        assert!(cache.get("service:svc_1").is_some());
    }

    #[tokio::test]
    async fn apply_routes_by_message_kind() {
        let (engine, cache) = engine();

        let env = Envelope::new(
            "service:status",
            Some(serde_json::json!({"id": "svc_1", "status": "up"})),
        );
        engine.apply(&PushMessage::decode(&env).unwrap());
        assert!(cache.get("service:svc_1").is_some());

        let env = Envelope::new(
            "request:status",
            Some(serde_json::json!([{"id": "req_1", "status": "pending"}])),
        );
        engine.apply(&PushMessage::decode(&env).unwrap());
        assert!(cache.get("request:req_1").is_some());
    }

    #[tokio::test]
    async fn acks_do_not_touch_the_cache() {
        let (engine, cache) = engine();
        let env = Envelope::new(
            "subscribe:status",
            Some(serde_json::json!({"kind": "request", "id": "req_1"})),
        );
        engine.apply(&PushMessage::decode(&env).unwrap());
        assert!(cache.is_empty());
    }
}
