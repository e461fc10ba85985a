//! # medialink-ledger
//!
//! Sliding-window rate limiter for user-initiated write actions.
//!
//! Admission questions are answered purely from a durable ledger of past
//! admission timestamps; there is no network dependency. The window math in
//! [`window`] is pure and storage-free; [`store`] provides the single-slot
//! durable storage seam; [`RateLimiter`] is the front the orchestrator uses.
//!
//! Enforcement is advisory and client-side: no locking is performed, and two
//! racing admission checks may both pass. The backend remains the
//! authoritative enforcer.

#![deny(unsafe_code)]

pub mod limiter;
pub mod store;
pub mod window;

pub use limiter::RateLimiter;
pub use store::{JsonFileStore, LedgerStore, MemoryStore, ledger_file_path};
