//! `SwaphookServer`: Axum HTTP + WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use swaphook_crypto::DecryptionKeyMaterial;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::routes::test_app::test_app_handler;
use crate::routes::webhook::webhook_handler;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::broadcast::BroadcastHub;
use crate::websocket::session::{SessionTimings, run_ws_session};

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Subscriber set and fan-out.
    pub hub: Arc<BroadcastHub>,
    /// Process-wide decryption key and IV.
    pub keys: Arc<DecryptionKeyMaterial>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Renders `/metrics`.
    pub metrics: PrometheusHandle,
    /// When the server started.
    pub start_time: Instant,
}

/// The swaphook server.
pub struct SwaphookServer {
    config: Arc<ServerConfig>,
    keys: Arc<DecryptionKeyMaterial>,
    hub: Arc<BroadcastHub>,
    shutdown: Arc<ShutdownCoordinator>,
    metrics: PrometheusHandle,
    start_time: Instant,
}

impl SwaphookServer {
    /// Create a server. Nothing is bound until [`listen`](Self::listen).
    pub fn new(config: ServerConfig, keys: DecryptionKeyMaterial, metrics: PrometheusHandle) -> Self {
        let hub = BroadcastHub::new(config.send_queue_capacity);
        Self {
            config: Arc::new(config),
            keys: Arc::new(keys),
            hub: Arc::new(hub),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            metrics,
            start_time: Instant::now(),
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            hub: self.hub.clone(),
            keys: self.keys.clone(),
            config: self.config.clone(),
            shutdown: self.shutdown.clone(),
            metrics: self.metrics.clone(),
            start_time: self.start_time,
        };

        Router::new()
            .route("/api/webhook", post(webhook_handler))
            .route("/test-app", get(test_app_handler))
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .layer(DefaultBodyLimit::max(self.config.max_body_bytes))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Bind the configured address and serve until shutdown is signalled.
    ///
    /// Returns the bound address (useful with port `0`) and the server task.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        let router = self.router();
        let token = self.shutdown.token();

        info!(%addr, "swaphook server listening");
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
            {
                error!(error = %e, "server error");
            }
        });
        Ok((addr, handle))
    }

    /// The broadcast hub.
    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    /// The shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// The server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET /ws
///
/// The subscriber slot is reserved before the upgrade is accepted, so the
/// connection cap holds under concurrent upgrades. A failed upgrade releases
/// the slot.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let max = state.config.max_connections;
    let Some(subscription) = state.hub.try_subscribe(max).await else {
        warn!(max, "connection limit reached, rejecting upgrade");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "too many connections" })),
        )
            .into_response();
    };

    let timings = SessionTimings::from(&*state.config);
    let hub = state.hub.clone();
    let conn_id = subscription.connection.id.clone();
    ws.on_failed_upgrade(move |e| {
        warn!(conn_id = %conn_id, error = %e, "websocket upgrade failed");
        let _ = tokio::spawn(async move {
            let _ = hub.unsubscribe(&conn_id).await;
        });
    })
    .on_upgrade(move |socket| async move {
        let session = run_ws_session(
            socket,
            subscription,
            state.hub.clone(),
            timings,
            state.shutdown.token(),
        );
        let _ = state.shutdown.track(session).await;
    })
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = state.hub.connection_count().await;
    Json(health::health_check(state.start_time, connections))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> String {
    state.metrics.render()
}
