//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`SwaphookSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply `SWAPHOOK_*` environment overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::fmt::Display;
use std::path::{Path, PathBuf};

use serde_json::Value;
use swaphook_core::logging::LogFormat;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::SwaphookSettings;

// Inclusive bounds shared by the settings file and env overrides.
const MAX_CONNECTIONS: (usize, usize) = (1, 1_000_000);
const HEARTBEAT_INTERVAL_SECS: (u64, u64) = (1, 3600);
const HEARTBEAT_TIMEOUT_SECS: (u64, u64) = (1, 86_400);
const SEND_TIMEOUT_MS: (u64, u64) = (10, 600_000);
const SEND_QUEUE_CAPACITY: (usize, usize) = (1, 65_536);
const MAX_BODY_BYTES: (usize, usize) = (64, 67_108_864);
const SHUTDOWN_TIMEOUT_SECS: (u64, u64) = (0, 600);

/// Resolve the default settings file path (`~/.swaphook/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".swaphook").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<SwaphookSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. A file with invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<SwaphookSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Defaults merged with the file at `path`, without env overrides.
///
/// Numeric values outside their accepted range are an error.
pub fn load_file_layer(path: &Path) -> Result<SwaphookSettings> {
    let defaults = serde_json::to_value(SwaphookSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let settings = serde_json::from_value(merged)?;
    validate(&settings)?;
    Ok(settings)
}

/// Check every bounded server setting against its accepted range.
pub fn validate(settings: &SwaphookSettings) -> Result<()> {
    let server = &settings.server;
    check("maxConnections", server.max_connections, MAX_CONNECTIONS)?;
    check("heartbeatIntervalSecs", server.heartbeat_interval_secs, HEARTBEAT_INTERVAL_SECS)?;
    check("heartbeatTimeoutSecs", server.heartbeat_timeout_secs, HEARTBEAT_TIMEOUT_SECS)?;
    check("sendTimeoutMs", server.send_timeout_ms, SEND_TIMEOUT_MS)?;
    check("sendQueueCapacity", server.send_queue_capacity, SEND_QUEUE_CAPACITY)?;
    check("maxBodyBytes", server.max_body_bytes, MAX_BODY_BYTES)?;
    check("shutdownTimeoutSecs", server.shutdown_timeout_secs, SHUTDOWN_TIMEOUT_SECS)?;
    Ok(())
}

fn check<T: PartialOrd + Display>(key: &'static str, value: T, (min, max): (T, T)) -> Result<()> {
    if value < min || value > max {
        return Err(SettingsError::OutOfRange {
            key,
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        });
    }
    Ok(())
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `SWAPHOOK_*` environment overrides.
pub fn apply_env_overrides(settings: &mut SwaphookSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary variable lookup.
///
/// Integers must parse and fall within range; invalid values are logged and
/// ignored so the file or default value stands.
pub fn apply_overrides<F>(settings: &mut SwaphookSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };
    let server = &mut settings.server;

    if let Some(v) = env.string("SWAPHOOK_HOST") {
        server.host = v;
    }
    if let Some(v) = env.parsed("SWAPHOOK_PORT", |s| parse_u16_range(s, 1, 65535)) {
        server.port = v;
    }
    if let Some(v) = env.parsed("SWAPHOOK_MAX_CONNECTIONS", |s| {
        parse_usize_range(s, MAX_CONNECTIONS.0, MAX_CONNECTIONS.1)
    }) {
        server.max_connections = v;
    }
    if let Some(v) = env.parsed("SWAPHOOK_HEARTBEAT_INTERVAL_SECS", |s| {
        parse_u64_range(s, HEARTBEAT_INTERVAL_SECS.0, HEARTBEAT_INTERVAL_SECS.1)
    }) {
        server.heartbeat_interval_secs = v;
    }
    if let Some(v) = env.parsed("SWAPHOOK_HEARTBEAT_TIMEOUT_SECS", |s| {
        parse_u64_range(s, HEARTBEAT_TIMEOUT_SECS.0, HEARTBEAT_TIMEOUT_SECS.1)
    }) {
        server.heartbeat_timeout_secs = v;
    }
    if let Some(v) = env.parsed("SWAPHOOK_SEND_TIMEOUT_MS", |s| {
        parse_u64_range(s, SEND_TIMEOUT_MS.0, SEND_TIMEOUT_MS.1)
    }) {
        server.send_timeout_ms = v;
    }
    if let Some(v) = env.parsed("SWAPHOOK_SEND_QUEUE_CAPACITY", |s| {
        parse_usize_range(s, SEND_QUEUE_CAPACITY.0, SEND_QUEUE_CAPACITY.1)
    }) {
        server.send_queue_capacity = v;
    }
    if let Some(v) = env.parsed("SWAPHOOK_MAX_BODY_BYTES", |s| {
        parse_usize_range(s, MAX_BODY_BYTES.0, MAX_BODY_BYTES.1)
    }) {
        server.max_body_bytes = v;
    }
    if let Some(v) = env.parsed("SWAPHOOK_SHUTDOWN_TIMEOUT_SECS", |s| {
        parse_u64_range(s, SHUTDOWN_TIMEOUT_SECS.0, SHUTDOWN_TIMEOUT_SECS.1)
    }) {
        server.shutdown_timeout_secs = v;
    }

    if let Some(v) = env.string("SWAPHOOK_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.parsed("SWAPHOOK_LOG_FORMAT", LogFormat::parse) {
        settings.logging.format = v;
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn parsed<T>(&self, name: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
        let val = self.string(name)?;
        let result = parse(&val);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid env var, ignoring");
        }
        result
    }
}
