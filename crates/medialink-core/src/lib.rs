//! # medialink-core
//!
//! Foundation types for the medialink realtime synchronization layer.
//!
//! This crate provides the shared vocabulary that the transport, ledger, and
//! sync crates depend on:
//!
//! - **Connection state**: [`ConnectionState`] snapshots and
//!   [`ConnectionQuality`] buckets
//! - **Push messages**: the [`PushMessage`] closed union with one typed
//!   payload per wire kind, decoded and validated once at the transport
//!   boundary
//! - **Errors**: the [`errors`] hierarchy via `thiserror`
//! - **Backoff**: pure reconnect delay math in [`backoff`]
//! - **Logging**: `tracing` subscriber setup in [`logging`]

#![deny(unsafe_code)]

pub mod backoff;
pub mod errors;
pub mod logging;
pub mod messages;
pub mod state;
pub mod time;

pub use errors::{AdmissionError, MedialinkError, StorageError, SubmissionError, TransportError};
pub use messages::{Envelope, EntityUpdate, PushMessage};
pub use state::{ConnectionQuality, ConnectionState};
