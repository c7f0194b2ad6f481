//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so a settings
//! file may name only the fields it overrides.

use serde::{Deserialize, Serialize};
use swaphook_core::logging::LogFormat;

/// Root settings type.
///
/// ```json
/// {
///   "server": { "port": 4000, "maxConnections": 200 },
///   "logging": { "level": "debug", "format": "json" }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SwaphookSettings {
    /// HTTP and WebSocket server settings.
    pub server: ServerSettings,
    /// Log output settings.
    pub logging: LoggingSettings,
}

/// Server network and connection settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Listen port for HTTP and WebSocket traffic.
    pub port: u16,
    /// Upgrade requests beyond this many live connections get 503.
    pub max_connections: usize,
    /// Interval between WebSocket pings.
    pub heartbeat_interval_secs: u64,
    /// A connection silent for this long is closed.
    pub heartbeat_timeout_secs: u64,
    /// Upper bound on a single socket write.
    pub send_timeout_ms: u64,
    /// Depth of each connection's outbound queue.
    pub send_queue_capacity: usize,
    /// Largest accepted webhook body.
    pub max_body_bytes: usize,
    /// How long shutdown waits for connections to drain.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3008,
            max_connections: 1000,
            heartbeat_interval_secs: 25,
            heartbeat_timeout_secs: 60,
            send_timeout_ms: 5000,
            send_queue_capacity: 64,
            max_body_bytes: 1_048_576,
            shutdown_timeout_secs: 10,
        }
    }
}

/// Log output settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Line format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults() {
        let s = SwaphookSettings::default();
        assert_eq!(s.server.host, "0.0.0.0");
        assert_eq!(s.server.port, 3008);
        assert_eq!(s.server.max_connections, 1000);
        assert_eq!(s.server.heartbeat_interval_secs, 25);
        assert_eq!(s.server.heartbeat_timeout_secs, 60);
        assert_eq!(s.server.send_queue_capacity, 64);
        assert_eq!(s.logging.level, "info");
        assert_eq!(s.logging.format, LogFormat::Compact);
    }

    #[test]
    fn serializes_camel_case() {
        let value = serde_json::to_value(SwaphookSettings::default()).unwrap();
        assert_eq!(value["server"]["maxConnections"], 1000);
        assert_eq!(value["server"]["sendTimeoutMs"], 5000);
        assert_eq!(value["logging"]["format"], "compact");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: SwaphookSettings =
            serde_json::from_value(json!({"server": {"port": 4000}})).unwrap();
        assert_eq!(s.server.port, 4000);
        assert_eq!(s.server.host, "0.0.0.0");
        assert_eq!(s.logging, LoggingSettings::default());
    }
}
