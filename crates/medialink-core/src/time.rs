//! Epoch-millisecond clock access and temporal wire-field normalization.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

/// Current time as epoch milliseconds.
#[must_use]
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Current time as a canonical RFC 3339 UTC string.
#[must_use]
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Normalize a date-like wire value into a canonical RFC 3339 UTC string.
///
/// The backend sends timestamps in three shapes: epoch milliseconds, RFC
/// 3339 strings, and RFC 2822 strings. Returns `None` when the value is not
/// recognizably a timestamp, so callers can leave it untouched.
#[must_use]
pub fn normalize_timestamp(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => {
            let millis = n.as_i64()?;
            let dt = Utc.timestamp_millis_opt(millis).single()?;
            Some(dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        }
        Value::String(s) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(
                    dt.with_timezone(&Utc)
                        .to_rfc3339_opts(SecondsFormat::Millis, true),
                );
            }
            if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
                return Some(
                    dt.with_timezone(&Utc)
                        .to_rfc3339_opts(SecondsFormat::Millis, true),
                );
            }
            None
        }
        _ => None,
    }
}
