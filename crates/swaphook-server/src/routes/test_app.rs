//! `GET /test-app`: liveness broadcast.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};
use swaphook_core::ChannelEvent;
use swaphook_core::messages::HELLO_WORLD;
use tracing::info;

use crate::server::AppState;

/// Broadcast `{"data": "Hello, World!"}` on `message` to every subscriber.
pub async fn test_app_handler(State(state): State<AppState>) -> Json<Value> {
    let report = state.hub.broadcast(&ChannelEvent::hello_world()).await;
    info!(recipients = report.recipients, "liveness broadcast sent");
    Json(json!({ "message": HELLO_WORLD }))
}
