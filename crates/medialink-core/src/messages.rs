//! Wire envelope and the closed union of push message kinds.
//!
//! Every frame on the link is a JSON [`Envelope`] with a `type` name and an
//! optional `data` payload. Inbound frames are decoded into [`PushMessage`]
//! exactly once, at the transport boundary; consumers never parse raw JSON.
//! A frame whose payload does not validate for its kind decodes to `None`
//! and is dropped there, so one malformed message cannot destabilize any
//! downstream cache.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ─────────────────────────────────────────────────────────────────────────────
// Event names
// ─────────────────────────────────────────────────────────────────────────────

/// Wire event names used on the link.
pub mod event {
    /// Server acknowledgement of the link itself; also answers quality probes.
    pub const CONNECTION_STATUS: &str = "connection:status";
    /// Single or bulk service-health update.
    pub const SERVICE_STATUS: &str = "service:status";
    /// Single or bulk media-request update.
    pub const REQUEST_STATUS: &str = "request:status";
    /// Acknowledgement of a `subscribe:*` emit.
    pub const SUBSCRIBE_STATUS: &str = "subscribe:status";
    /// Acknowledgement of an `unsubscribe:*` emit.
    pub const UNSUBSCRIBE_STATUS: &str = "unsubscribe:status";
    /// Client-to-server: open a resource-scoped request subscription.
    pub const SUBSCRIBE_REQUEST: &str = "subscribe:request";
    /// Client-to-server: close a resource-scoped request subscription.
    pub const UNSUBSCRIBE_REQUEST: &str = "unsubscribe:request";
    /// Client-to-server: ask the backend to re-push a resource.
    pub const REQUEST_REFRESH: &str = "request:refresh";
    /// Client-to-server: post-handshake authentication.
    pub const LOGIN: &str = "login";
}

// ─────────────────────────────────────────────────────────────────────────────
// Envelope
// ─────────────────────────────────────────────────────────────────────────────

/// One frame on the wire: `{"type": ..., "data": ..., "timestamp": ...}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Wire event name, e.g. `service:status`.
    #[serde(rename = "type")]
    pub event: String,
    /// Kind-specific payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Sender timestamp, if the sender attached one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Envelope {
    /// Build an outbound envelope.
    #[must_use]
    pub fn new(event: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            event: event.into(),
            data,
            timestamp: None,
        }
    }

    /// Parse a raw text frame. Returns `None` for anything that is not an
    /// envelope-shaped JSON object.
    #[must_use]
    pub fn parse(frame: &str) -> Option<Self> {
        serde_json::from_str(frame).ok()
    }

    /// Serialize for the wire.
    ///
    /// Serialization of an envelope built from well-formed parts cannot
    /// fail; a failure is reported as an empty object rather than a panic.
    #[must_use]
    pub fn to_frame(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_owned())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Typed push messages
// ─────────────────────────────────────────────────────────────────────────────

/// A validated single-entity update: the entity id plus whatever fields the
/// sender included. Absent fields are left untouched by the cache layer.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityUpdate {
    /// Entity identifier.
    pub id: String,
    /// Fields present in the message, excluding `id`.
    pub fields: Map<String, Value>,
}

impl EntityUpdate {
    /// Extract an update from a JSON object payload.
    ///
    /// The id may arrive as a string or a number (the backend is not
    /// consistent); anything else fails validation.
    #[must_use]
    pub fn from_object(object: &Map<String, Value>) -> Option<Self> {
        let id = match object.get("id") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return None,
        };
        let mut fields = object.clone();
        let _ = fields.remove("id");
        Some(Self { id, fields })
    }
}

/// Result of a `subscribe:*` / `unsubscribe:*` round trip.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SubscriptionAck {
    /// Resource kind the acknowledgement refers to.
    pub kind: String,
    /// Resource id, when the subscription was resource-scoped.
    #[serde(default)]
    pub id: Option<String>,
    /// Whether the backend accepted the subscription change.
    #[serde(default = "default_true")]
    pub ok: bool,
}

fn default_true() -> bool {
    true
}

/// Server-reported link status; also the reply to a quality probe.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkStatus {
    /// Whether the backend considers the link healthy.
    #[serde(default = "default_true")]
    pub connected: bool,
    /// Echoed probe nonce, present only on probe replies.
    #[serde(default)]
    pub nonce: Option<String>,
}

/// The closed union of inbound message kinds.
///
/// Single-entity and bulk shapes are distinct variants rather than a bulk of
/// size one: their malformed-input policy differs downstream (a bad single
/// update must preserve the existing record, a bad bulk update must preserve
/// the whole collection).
#[derive(Clone, Debug, PartialEq)]
pub enum PushMessage {
    /// Link status / probe reply.
    ConnectionStatus(LinkStatus),
    /// Delta for one monitored service.
    ServiceStatus(EntityUpdate),
    /// Full refresh of the monitored-service list.
    ServiceList(Vec<Map<String, Value>>),
    /// Delta for one media request.
    RequestStatus(EntityUpdate),
    /// Full refresh of the media-request list.
    RequestList(Vec<Map<String, Value>>),
    /// Subscribe acknowledgement.
    Subscribed(SubscriptionAck),
    /// Unsubscribe acknowledgement.
    Unsubscribed(SubscriptionAck),
}

impl PushMessage {
    /// Decode a parsed envelope into a typed message.
    ///
    /// Returns `None` for unknown event names and for payloads that fail
    /// validation for their kind. Status events accept either an object
    /// (single update) or an array (bulk refresh), matching what the backend
    /// actually sends.
    #[must_use]
    pub fn decode(envelope: &Envelope) -> Option<Self> {
        match envelope.event.as_str() {
            event::CONNECTION_STATUS => {
                let data = envelope.data.clone().unwrap_or(Value::Null);
                let status = serde_json::from_value(data).unwrap_or(LinkStatus {
                    connected: true,
                    nonce: None,
                });
                Some(Self::ConnectionStatus(status))
            }
            event::SERVICE_STATUS => {
                decode_status(envelope.data.as_ref(), Self::ServiceStatus, Self::ServiceList)
            }
            event::REQUEST_STATUS => {
                decode_status(envelope.data.as_ref(), Self::RequestStatus, Self::RequestList)
            }
            event::SUBSCRIBE_STATUS => decode_ack(envelope.data.as_ref()).map(Self::Subscribed),
            event::UNSUBSCRIBE_STATUS => {
                decode_ack(envelope.data.as_ref()).map(Self::Unsubscribed)
            }
            _ => None,
        }
    }

    /// The wire event name this message arrived under.
    #[must_use]
    pub fn event(&self) -> &'static str {
        match self {
            Self::ConnectionStatus(_) => event::CONNECTION_STATUS,
            Self::ServiceStatus(_) | Self::ServiceList(_) => event::SERVICE_STATUS,
            Self::RequestStatus(_) | Self::RequestList(_) => event::REQUEST_STATUS,
            Self::Subscribed(_) => event::SUBSCRIBE_STATUS,
            Self::Unsubscribed(_) => event::UNSUBSCRIBE_STATUS,
        }
    }
}

fn decode_status(
    data: Option<&Value>,
    single: fn(EntityUpdate) -> PushMessage,
    bulk: fn(Vec<Map<String, Value>>) -> PushMessage,
) -> Option<PushMessage> {
    match data {
        Some(Value::Object(object)) => EntityUpdate::from_object(object).map(single),
        Some(Value::Array(items)) => {
            // Non-object entries are skipped rather than failing the batch.
            let entries = items
                .iter()
                .filter_map(|item| item.as_object().cloned())
                .collect();
            Some(bulk(entries))
        }
        _ => None,
    }
}

fn decode_ack(data: Option<&Value>) -> Option<SubscriptionAck> {
    let data = data?;
    serde_json::from_value(data.clone()).ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// Outbound helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Envelope opening a resource-scoped request subscription.
#[must_use]
pub fn subscribe_request(request_id: &str) -> Envelope {
    Envelope::new(
        event::SUBSCRIBE_REQUEST,
        Some(serde_json::json!({ "id": request_id })),
    )
}

/// Envelope closing a resource-scoped request subscription.
#[must_use]
pub fn unsubscribe_request(request_id: &str) -> Envelope {
    Envelope::new(
        event::UNSUBSCRIBE_REQUEST,
        Some(serde_json::json!({ "id": request_id })),
    )
}

/// Envelope asking the backend to re-push one resource.
#[must_use]
pub fn request_refresh(resource_id: &str) -> Envelope {
    Envelope::new(
        event::REQUEST_REFRESH,
        Some(serde_json::json!({ "id": resource_id })),
    )
}

/// Envelope carrying a quality-probe nonce.
#[must_use]
pub fn probe(nonce: &str) -> Envelope {
    Envelope::new(
        event::CONNECTION_STATUS,
        Some(serde_json::json!({ "nonce": nonce })),
    )
}

/// Post-handshake authentication envelope.
#[must_use]
pub fn login(username: &str, password: &str) -> Envelope {
    Envelope::new(
        event::LOGIN,
        Some(serde_json::json!({ "username": username, "password": password })),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
