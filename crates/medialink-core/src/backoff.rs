//! Reconnect delay policy.
//!
//! Pure math, no timers: the connection manager asks the policy how long to
//! wait before retry attempt N and does its own sleeping. Automatic retries
//! are unbounded; the delay grows exponentially up to a cap so an
//! unreachable backend is not hammered.

use serde::{Deserialize, Serialize};

/// Default base delay between retries in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;
/// Default maximum delay between retries in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;
/// Fixed delay used by an explicit `reconnect()` request.
pub const EXPLICIT_RECONNECT_DELAY_MS: u64 = 1_000;

/// Delay policy for automatic reconnection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconnectPolicy {
    /// Base delay for the first retry in ms.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Maximum delay between retries in ms.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_base_delay_ms() -> u64 {
    DEFAULT_BASE_DELAY_MS
}
fn default_max_delay_ms() -> u64 {
    DEFAULT_MAX_DELAY_MS
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retry `attempt` (zero-based).
    ///
    /// Formula: `min(max_delay, base_delay * 2^attempt)`, saturating.
    #[must_use]
    pub fn delay_ms(&self, attempt: u32) -> u64 {
        let exponential = self.base_delay_ms.saturating_mul(1u64 << attempt.min(31));
        exponential.min(self.max_delay_ms)
    }
}
