//! Error hierarchy for the medialink realtime layer.
//!
//! Built on [`thiserror`]:
//!
//! - [`MedialinkError`]: top-level enum covering all error domains
//! - [`AdmissionError`]: rate limit exceeded, carries the reset time
//! - [`TransportError`]: link-level failures, surfaced via state snapshots
//! - [`SubmissionError`]: submit-call failures, normalized for display
//! - [`StorageError`]: durable ledger slot I/O
//! - [`ConfigError`]: configuration loading
//!
//! Transport failures are never thrown across the public notification path;
//! they are captured on state snapshots and delivered to observers. The
//! typed errors here cover the request/response paths where a `Result` is
//! the natural shape.

use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// MedialinkError — top-level error enum
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level error type for the medialink layer.
#[derive(Debug, Error)]
pub enum MedialinkError {
    /// Admission denied by the rate limiter.
    #[error("{0}")]
    Admission(#[from] AdmissionError),

    /// Transport-level failure.
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// Submission API failure.
    #[error("{0}")]
    Submission(#[from] SubmissionError),

    /// Durable storage failure.
    #[error("{0}")]
    Storage(#[from] StorageError),

    /// Configuration failure.
    #[error("{0}")]
    Config(#[from] ConfigError),
}

impl MedialinkError {
    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Admission(_) => "RATE_LIMITED",
            Self::Transport(e) => e.code(),
            Self::Submission(_) => "SUBMISSION_FAILED",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AdmissionError
// ─────────────────────────────────────────────────────────────────────────────

/// Rate limit exceeded. Never touches the network.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("rate limit reached: {limit} requests per window")]
pub struct AdmissionError {
    /// Configured request limit for the window.
    pub limit: u32,
    /// Remaining quota at denial time (always zero).
    pub remaining: u32,
    /// Epoch milliseconds at which the oldest counted request leaves the
    /// window and one slot frees up. `None` only if the ledger emptied
    /// between the check and the denial.
    pub reset_at: Option<i64>,
}

impl AdmissionError {
    /// Create a denial for the given limit and reset time.
    #[must_use]
    pub fn new(limit: u32, reset_at: Option<i64>) -> Self {
        Self {
            limit,
            remaining: 0,
            reset_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TransportError
// ─────────────────────────────────────────────────────────────────────────────

/// Link-level failure.
///
/// These are reported on [`crate::ConnectionState`] snapshots and to `error`
/// event listeners; the connection manager retries, it does not propagate.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The configured endpoint could not be interpreted as a URL.
    #[error("invalid endpoint: {url}")]
    InvalidEndpoint {
        /// The offending URL string.
        url: String,
    },

    /// The handshake with the backend failed.
    #[error("handshake failed: {message}")]
    Handshake {
        /// Underlying failure description.
        message: String,
    },

    /// The link dropped or the peer closed it.
    #[error("connection closed")]
    Closed,

    /// A frame could not be written to the link.
    #[error("send failed: {message}")]
    Send {
        /// Underlying failure description.
        message: String,
    },

    /// The link failed while reading.
    #[error("receive failed: {message}")]
    Recv {
        /// Underlying failure description.
        message: String,
    },

    /// A quality probe did not get a reply in time.
    #[error("quality probe timed out")]
    ProbeTimeout,
}

impl TransportError {
    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidEndpoint { .. } => "TRANSPORT_ENDPOINT_ERROR",
            Self::Handshake { .. } => "TRANSPORT_HANDSHAKE_ERROR",
            Self::Closed => "TRANSPORT_CLOSED",
            Self::Send { .. } => "TRANSPORT_SEND_ERROR",
            Self::Recv { .. } => "TRANSPORT_RECV_ERROR",
            Self::ProbeTimeout => "TRANSPORT_PROBE_TIMEOUT",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SubmissionError
// ─────────────────────────────────────────────────────────────────────────────

/// Generic message shown to users when a submission fails.
pub const SUBMISSION_FAILED_MESSAGE: &str =
    "The request could not be submitted. Please try again.";

/// A submission API call was rejected.
///
/// The displayed message is always user-safe; the raw backend error is kept
/// only for logging and never rendered.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SubmissionError {
    /// User-safe message.
    pub message: String,
    /// Raw internal detail, for logs only.
    pub detail: Option<String>,
}

impl SubmissionError {
    /// Normalize an internal failure into the generic user-safe message,
    /// retaining the raw detail for logging.
    #[must_use]
    pub fn normalized(detail: impl Into<String>) -> Self {
        Self {
            message: SUBMISSION_FAILED_MESSAGE.to_owned(),
            detail: Some(detail.into()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// StorageError / ConfigError
// ─────────────────────────────────────────────────────────────────────────────

/// Durable ledger slot I/O failure.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem failure.
    #[error("ledger storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The ledger could not be serialized.
    #[error("ledger serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Configuration loading failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file exists but could not be read.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    /// The settings file exists but is not valid JSON for the schema.
    #[error("failed to parse settings file: {0}")]
    Parse(#[from] serde_json::Error),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
