//! The submit-then-track workflow.
//!
//! The only component that performs a write. Each invocation runs
//! `idle → checking-admission → (rejected | submitting) → (failed |
//! succeeded)`:
//!
//! - **rejected**: no network call is made; the caller gets a typed
//!   admission error carrying the reset time
//! - **succeeded**: the admission is tracked in the ledger, the `request:`
//!   cache slice is invalidated, and — only while connected — a
//!   resource-scoped subscription is opened so push notifications for the
//!   new request flow through the cache engine
//! - **failed**: the error is normalized to a user-safe message and nothing
//!   else happens: no tracking, no cache mutation, no subscription
//!
//! Concurrent invocations are independent; there is no de-duplication by
//! payload identity.

use std::sync::Arc;

use medialink_core::errors::{AdmissionError, MedialinkError, SubmissionError};
use medialink_core::messages;
use medialink_ledger::RateLimiter;
use medialink_transport::ConnectionManager;
use tracing::{debug, info, warn};

use crate::cache::KeyedCache;
use crate::submit::{MediaRequest, SubmissionApi};

/// Successful submission result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// Backend-assigned id of the created request.
    pub request_id: String,
    /// Whether a push subscription was opened for it. `false` when the
    /// link was down at submit time; the write still succeeded, but updates
    /// arrive only after reconnection.
    pub tracking: bool,
}

/// Composes admission control, the submission API, and post-submission
/// tracking.
pub struct RequestOrchestrator {
    api: Arc<dyn SubmissionApi>,
    limiter: RateLimiter,
    cache: Arc<dyn KeyedCache>,
    manager: Arc<ConnectionManager>,
    limit: u32,
    window_ms: i64,
}

impl RequestOrchestrator {
    /// Wire an orchestrator over its collaborators.
    #[must_use]
    pub fn new(
        api: Arc<dyn SubmissionApi>,
        limiter: RateLimiter,
        cache: Arc<dyn KeyedCache>,
        manager: Arc<ConnectionManager>,
        limit: u32,
        window_ms: i64,
    ) -> Self {
        Self {
            api,
            limiter,
            cache,
            manager,
            limit,
            window_ms,
        }
    }

    /// Submit one media request.
    pub async fn submit(&self, request: &MediaRequest) -> Result<SubmitOutcome, MedialinkError> {
        if !self.limiter.can_request(self.limit, self.window_ms) {
            let reset_at = self.limiter.reset_time(self.window_ms);
            debug!(title = %request.title, ?reset_at, "submission rejected by rate limit");
            return Err(AdmissionError::new(self.limit, reset_at).into());
        }

        match self.api.submit_request(request).await {
            Ok(receipt) => {
                self.limiter.track_request();
                self.cache.invalidate("request:");

                let tracking = self.manager.is_connected();
                if tracking {
                    self.manager
                        .emit_envelope(messages::subscribe_request(&receipt.request_id));
                } else {
                    debug!(
                        request_id = %receipt.request_id,
                        "link down at submit time, skipping push subscription"
                    );
                }
                info!(request_id = %receipt.request_id, tracking, "request submitted");
                Ok(SubmitOutcome {
                    request_id: receipt.request_id,
                    tracking,
                })
            }
            Err(api_error) => {
                warn!(error = %api_error, "submission failed");
                Err(SubmissionError::normalized(api_error.0).into())
            }
        }
    }

    /// Ask the backend to re-push one resource over the link.
    /// Fire-and-forget; a no-op while disconnected.
    pub fn refresh_resource(&self, resource_id: &str) {
        self.manager
            .emit_envelope(messages::request_refresh(resource_id));
    }

    /// Close the resource-scoped subscription for a tracked request.
    /// Fire-and-forget; a no-op while disconnected.
    pub fn stop_tracking(&self, request_id: &str) {
        self.manager
            .emit_envelope(messages::unsubscribe_request(request_id));
    }

    /// Remaining quota in the current window.
    #[must_use]
    pub fn remaining_requests(&self) -> u32 {
        self.limiter.remaining_requests(self.limit, self.window_ms)
    }

    /// Whether one more submission would be admitted now.
    #[must_use]
    pub fn can_request(&self) -> bool {
        self.limiter.can_request(self.limit, self.window_ms)
    }

    /// When the oldest counted admission leaves the window.
    #[must_use]
    pub fn reset_time(&self) -> Option<i64> {
        self.limiter.reset_time(self.window_ms)
    }
}
