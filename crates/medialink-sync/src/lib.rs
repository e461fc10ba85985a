//! # medialink-sync
//!
//! The read-side and write-side halves of the realtime layer:
//!
//! - [`CacheEngine`]: merges single-entity and bulk push updates into a
//!   shared keyed collection without corrupting unrelated entries, and
//!   maintains ephemeral just-updated markers for transient UI emphasis
//! - [`RequestOrchestrator`]: the only component that performs a write —
//!   admission check, submission, then post-submission tracking
//! - [`DashboardClient`]: the facade UI layers hold, wiring the connection
//!   manager, rate limiter, cache engine, and orchestrator together

#![deny(unsafe_code)]

pub mod cache;
pub mod client;
pub mod config;
pub mod engine;
pub mod markers;
pub mod orchestrator;
pub mod submit;

pub use cache::{KeyedCache, MemoryCache};
pub use client::DashboardClient;
pub use config::ClientConfig;
pub use engine::CacheEngine;
pub use markers::UpdateMarkers;
pub use orchestrator::{RequestOrchestrator, SubmitOutcome};
pub use submit::{ApiError, MediaRequest, MediaType, SubmissionApi, SubmitReceipt};
