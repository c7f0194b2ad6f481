//! Prometheus metrics recorder and metric names.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the global Prometheus recorder.
///
/// Returns the handle that renders `/metrics`. Call once at startup before
/// any metric is recorded.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// A handle backed by a recorder that is not installed globally.
///
/// Renders an empty page; used by tests and by embedders that record
/// metrics elsewhere.
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

/// Webhook requests (counter, labels: outcome).
pub const WEBHOOK_REQUESTS_TOTAL: &str = "webhook_requests_total";
/// Webhook handling latency (histogram).
pub const WEBHOOK_REQUEST_DURATION_SECONDS: &str = "webhook_request_duration_seconds";
/// Broadcasts performed (counter, labels: event).
pub const BROADCAST_EVENTS_TOTAL: &str = "broadcast_events_total";
/// Frames dropped for full or closed subscriber queues (counter).
pub const BROADCAST_DROPS_TOTAL: &str = "broadcast_drops_total";
/// WebSocket connections opened (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket connections closed (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Open WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detached_handle_renders() {
        let output = detached_handle().render();
        assert!(!output.contains("webhook_requests_total"));
    }

    #[test]
    fn metric_names_are_snake_case() {
        let names = [
            WEBHOOK_REQUESTS_TOTAL,
            WEBHOOK_REQUEST_DURATION_SECONDS,
            BROADCAST_EVENTS_TOTAL,
            BROADCAST_DROPS_TOTAL,
            WS_CONNECTIONS_TOTAL,
            WS_DISCONNECTIONS_TOTAL,
            WS_CONNECTIONS_ACTIVE,
        ];
        for name in names {
            assert!(
                name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "metric name '{name}' must be snake_case"
            );
        }
    }
}
