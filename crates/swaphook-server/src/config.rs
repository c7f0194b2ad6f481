//! Server configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use swaphook_settings::ServerSettings;

/// Runtime configuration for [`SwaphookServer`](crate::server::SwaphookServer).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Maximum concurrent WebSocket connections.
    pub max_connections: usize,
    /// Ping interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// Close a connection after this long without inbound frames.
    pub heartbeat_timeout_secs: u64,
    /// Upper bound on one socket write, in milliseconds.
    pub send_timeout_ms: u64,
    /// Per-connection outbound queue depth.
    pub send_queue_capacity: usize,
    /// Maximum webhook body size in bytes.
    pub max_body_bytes: usize,
    /// Grace period for connection tasks at shutdown, in seconds.
    pub shutdown_timeout_secs: u64,
}

impl ServerConfig {
    /// Ping interval.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// Silence allowed before a connection is dropped.
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }

    /// Socket write bound.
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// Shutdown grace period.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// `host:port` bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            max_connections: 1000,
            heartbeat_interval_secs: 25,
            heartbeat_timeout_secs: 60,
            send_timeout_ms: 5000,
            send_queue_capacity: 64,
            max_body_bytes: 1024 * 1024,
            shutdown_timeout_secs: 10,
        }
    }
}

impl From<&ServerSettings> for ServerConfig {
    fn from(s: &ServerSettings) -> Self {
        Self {
            host: s.host.clone(),
            port: s.port,
            max_connections: s.max_connections,
            heartbeat_interval_secs: s.heartbeat_interval_secs,
            heartbeat_timeout_secs: s.heartbeat_timeout_secs,
            send_timeout_ms: s.send_timeout_ms,
            send_queue_capacity: s.send_queue_capacity,
            max_body_bytes: s.max_body_bytes,
            shutdown_timeout_secs: s.shutdown_timeout_secs,
        }
    }
}
