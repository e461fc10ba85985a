//! # medialink-transport
//!
//! Maintains exactly one logical push-style connection to the backend and
//! tolerates transport-level churn without observer-visible inconsistency.
//!
//! - [`ConnectionManager`]: the public surface — idempotent connect,
//!   non-throwing disconnect, state observers, named-event handlers,
//!   fire-and-forget emit, quality probes, explicit reconnect
//! - [`machine`]: the pure state-transition function driving snapshots
//! - [`Transport`] / [`TransportSession`]: the seam between the manager and
//!   the wire, with a tokio-tungstenite WebSocket implementation
//!
//! Link failures never cross the public API as errors; they are captured on
//! [`medialink_core::ConnectionState`] snapshots, retried automatically, and
//! surfaced to `error`-interested observers through the state stream.

#![deny(unsafe_code)]

pub mod machine;
pub mod manager;
pub mod observers;
pub mod registry;
pub mod transport;

pub use manager::{ConnectionManager, Credentials, ManagerConfig};
pub use observers::ObserverId;
pub use registry::SubscriptionHandle;
pub use transport::{Transport, TransportSession, WsTransport, normalize_endpoint};
