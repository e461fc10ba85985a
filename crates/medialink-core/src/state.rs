//! Connection state snapshots.
//!
//! A [`ConnectionState`] is an immutable value: the connection manager never
//! mutates a snapshot in place, it builds a new one on every transport event
//! and hands observers their own clone. Observers therefore cannot affect
//! each other through a shared reference.

use serde::{Deserialize, Serialize};

/// Coarse connection quality bucket derived from round-trip probes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionQuality {
    /// No probe has completed yet.
    #[default]
    Unknown,
    /// Round trip above the good threshold, or the probe timed out.
    Poor,
    /// Round trip below 300 ms.
    Good,
    /// Round trip below 100 ms.
    Excellent,
}

impl ConnectionQuality {
    /// Round-trip threshold below which quality is [`Excellent`](Self::Excellent).
    pub const EXCELLENT_BELOW_MS: u64 = 100;
    /// Round-trip threshold below which quality is [`Good`](Self::Good).
    pub const GOOD_BELOW_MS: u64 = 300;

    /// Bucket a measured round-trip time.
    #[must_use]
    pub fn from_round_trip(rtt_ms: u64) -> Self {
        if rtt_ms < Self::EXCELLENT_BELOW_MS {
            Self::Excellent
        } else if rtt_ms < Self::GOOD_BELOW_MS {
            Self::Good
        } else {
            Self::Poor
        }
    }
}

/// Immutable snapshot of the logical connection.
///
/// A fresh snapshot replaces the previous one on every transport lifecycle
/// event; the previous snapshot is superseded, never destroyed in place.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionState {
    /// Whether the handshake has completed and the link is live.
    pub connected: bool,
    /// Whether a handshake (initial or retry) is in flight.
    pub connecting: bool,
    /// Latest probe-derived quality bucket.
    pub quality: ConnectionQuality,
    /// Latest measured round trip in milliseconds, if any probe completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    /// Number of automatic retry cycles since the last successful handshake.
    pub reconnect_attempt: u32,
    /// Most recent transport error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl ConnectionState {
    /// The snapshot a manager starts from before any transport activity.
    #[must_use]
    pub fn initial() -> Self {
        Self::default()
    }
}
