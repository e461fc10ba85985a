//! Client configuration loading.
//!
//! Loading flow:
//! 1. Start with compiled [`ClientConfig::default()`]
//! 2. If the settings file exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use medialink_core::backoff::ReconnectPolicy;
use medialink_core::errors::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Default dashboard backend endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:3100";
/// Default submissions allowed per window.
pub const DEFAULT_REQUEST_LIMIT: u32 = 20;
/// Default admission window: one hour.
pub const DEFAULT_REQUEST_WINDOW_MS: i64 = 3_600_000;
/// Default just-updated marker lifetime.
pub const DEFAULT_MARKER_TTL_MS: u64 = 1_000;
/// Default quality-probe reply deadline.
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 5_000;

/// Resolve the path to the settings file (`~/.medialink/settings.json`).
#[must_use]
pub fn settings_path() -> PathBuf {
    PathBuf::from(default_data_dir()).join("settings.json")
}

fn default_data_dir() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_owned());
    format!("{home}/.medialink")
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_owned()
}
fn default_request_limit() -> u32 {
    DEFAULT_REQUEST_LIMIT
}
fn default_request_window_ms() -> i64 {
    DEFAULT_REQUEST_WINDOW_MS
}
fn default_marker_ttl_ms() -> u64 {
    DEFAULT_MARKER_TTL_MS
}
fn default_probe_timeout_ms() -> u64 {
    DEFAULT_PROBE_TIMEOUT_MS
}

/// Dashboard client configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    /// Backend endpoint; `http(s)://` or `ws(s)://`.
    pub endpoint: String,
    /// Account name for post-handshake authentication.
    pub username: Option<String>,
    /// Account password for post-handshake authentication.
    pub password: Option<String>,
    /// Submissions allowed per admission window.
    pub request_limit: u32,
    /// Admission window length in milliseconds.
    pub request_window_ms: i64,
    /// Just-updated marker lifetime in milliseconds.
    pub marker_ttl_ms: u64,
    /// Quality-probe reply deadline in milliseconds.
    pub probe_timeout_ms: u64,
    /// Automatic reconnection delay policy.
    pub reconnect: ReconnectPolicy,
    /// Directory holding the durable admission ledger.
    pub data_dir: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            username: None,
            password: None,
            request_limit: default_request_limit(),
            request_window_ms: default_request_window_ms(),
            marker_ttl_ms: default_marker_ttl_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            reconnect: ReconnectPolicy::default(),
            data_dir: default_data_dir(),
        }
    }
}

/// Load configuration from the default path with env var overrides.
pub fn load_config() -> Result<ClientConfig, ConfigError> {
    load_config_from_path(&settings_path())
}

/// Load configuration from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_config_from_path(path: &Path) -> Result<ClientConfig, ConfigError> {
    let defaults = serde_json::to_value(ClientConfig::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut config: ClientConfig = serde_json::from_value(merged)?;
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
#[must_use]
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to a loaded configuration.
///
/// Integers must parse and fall within range; invalid values are silently
/// ignored (falling back to file/default).
pub fn apply_env_overrides(config: &mut ClientConfig) {
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

fn apply_overrides_from(config: &mut ClientConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("MEDIALINK_ENDPOINT").filter(|v| !v.is_empty()) {
        config.endpoint = v;
    }
    if let Some(v) = lookup("MEDIALINK_USERNAME").filter(|v| !v.is_empty()) {
        config.username = Some(v);
    }
    if let Some(v) = lookup("MEDIALINK_PASSWORD").filter(|v| !v.is_empty()) {
        config.password = Some(v);
    }
    if let Some(v) = lookup("MEDIALINK_DATA_DIR").filter(|v| !v.is_empty()) {
        config.data_dir = v;
    }
    if let Some(v) = parse_in_range(lookup("MEDIALINK_REQUEST_LIMIT"), 1, 10_000) {
        config.request_limit = v as u32;
    }
    if let Some(v) = parse_in_range(lookup("MEDIALINK_REQUEST_WINDOW_MS"), 1_000, 86_400_000) {
        config.request_window_ms = v;
    }
}

fn parse_in_range(value: Option<String>, min: i64, max: i64) -> Option<i64> {
    value
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|v| (min..=max).contains(v))
}
