//! Pure connection state transitions.
//!
//! The reconnection loop is driven by an explicit event vocabulary rather
//! than ad-hoc mutation: the run loop observes the link, produces a
//! [`LinkEvent`], and [`apply`] computes the next snapshot. Keeping this a
//! pure function makes the retry policy reviewable and testable without any
//! transport.
//!
//! Phases: `disconnected → connecting → connected`, with transport failures
//! sending `connected → connecting` (automatic retry, unbounded) and an
//! explicit disconnect going straight to `disconnected` from anywhere.

use medialink_core::state::{ConnectionQuality, ConnectionState};

/// An observed link event.
#[derive(Clone, Debug, PartialEq)]
pub enum LinkEvent {
    /// A dial (initial or retry) is starting.
    Dialing {
        /// Zero-based retry counter; zero for the first attempt after an
        /// explicit connect and after every successful handshake.
        attempt: u32,
    },
    /// The handshake completed.
    HandshakeOk,
    /// The link failed (handshake error or mid-session failure).
    LinkFailed {
        /// Failure description, recorded on the snapshot.
        error: String,
    },
    /// The peer closed the link cleanly.
    LinkClosed,
    /// A quality probe completed with the given round trip.
    ProbeMeasured {
        /// Measured round trip in milliseconds.
        rtt_ms: u64,
    },
    /// A quality probe got no reply in time.
    ProbeTimedOut,
    /// The owner asked for an explicit disconnect.
    DisconnectRequested,
}

/// Compute the snapshot that supersedes `state` after `event`.
#[must_use]
pub fn apply(state: &ConnectionState, event: &LinkEvent) -> ConnectionState {
    let mut next = state.clone();
    match event {
        LinkEvent::Dialing { attempt } => {
            next.connected = false;
            next.connecting = true;
            next.reconnect_attempt = *attempt;
        }
        LinkEvent::HandshakeOk => {
            next.connected = true;
            next.connecting = false;
            next.reconnect_attempt = 0;
            next.last_error = None;
        }
        LinkEvent::LinkFailed { error } => {
            next.connected = false;
            next.connecting = true;
            next.last_error = Some(error.clone());
        }
        LinkEvent::LinkClosed => {
            next.connected = false;
            next.connecting = true;
            next.last_error = Some("connection closed".to_owned());
        }
        LinkEvent::ProbeMeasured { rtt_ms } => {
            next.quality = ConnectionQuality::from_round_trip(*rtt_ms);
            next.latency_ms = Some(*rtt_ms);
        }
        LinkEvent::ProbeTimedOut => {
            next.quality = ConnectionQuality::Poor;
            next.last_error = Some("quality probe timed out".to_owned());
        }
        LinkEvent::DisconnectRequested => {
            next.connected = false;
            next.connecting = false;
        }
    }
    next
}
