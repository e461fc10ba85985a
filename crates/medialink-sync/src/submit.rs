//! Submission payloads and the seam to the excluded API layer.
//!
//! The actual HTTP call lives outside this core; the orchestrator talks to
//! it through [`SubmissionApi`]. Raw API errors carry whatever the backend
//! said — they are normalized exactly once, in the orchestrator, before
//! anything user-facing sees them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of media being requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// A single film.
    Movie,
    /// An episodic series.
    Series,
}

/// A user-initiated media request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRequest {
    /// Title as the user entered or picked it.
    pub title: String,
    /// Movie or series.
    pub media_type: MediaType,
    /// Upstream catalog id, when the request came from a search result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

/// Backend acknowledgement of an accepted submission.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    /// Backend-assigned id used to track the request's completion.
    pub request_id: String,
}

/// Raw submission failure as reported by the API layer. Internal only.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ApiError(pub String);

/// The excluded API layer's submission entry point.
#[async_trait]
pub trait SubmissionApi: Send + Sync {
    /// Submit one media request. Invoked at most once per orchestrator
    /// invocation.
    async fn submit_request(&self, request: &MediaRequest) -> Result<SubmitReceipt, ApiError>;
}
