//! # swaphook-server
//!
//! Axum HTTP + `WebSocket` server for face-swap status webhooks.
//!
//! - `POST /api/webhook`: decrypt, classify and broadcast a status update
//! - `GET /test-app`: liveness broadcast
//! - `GET /ws`: subscriber endpoint; frames are `{"event", "data"}` JSON
//! - `GET /health`, `GET /metrics`
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod metrics;
pub mod pipeline;
pub mod routes;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use server::{AppState, SwaphookServer};
