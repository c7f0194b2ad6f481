//! WebSocket subscribers: connection state, the broadcast hub, heartbeat, and
//! the per-connection session loop.

pub mod broadcast;
pub mod connection;
pub mod heartbeat;
pub mod session;
