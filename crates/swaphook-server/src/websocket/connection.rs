//! Per-subscriber connection state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use swaphook_core::{ConnectionId, DeliveryError};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::Instant;

/// Lifecycle of a subscriber. `Disconnected` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Registered and receiving broadcasts.
    Connected,
    /// Removed from the hub; sends fail with [`DeliveryError::Closed`].
    Disconnected,
}

/// A connected WebSocket subscriber, as seen by the hub.
pub struct ClientConnection {
    /// Unique connection ID. Never reused.
    pub id: ConnectionId,
    /// Outbound queue drained by the connection's writer task.
    tx: mpsc::Sender<Arc<String>>,
    /// When this connection was established.
    pub connected_at: Instant,
    /// Time of the last inbound frame, refreshed by the reader.
    last_seen: Mutex<Instant>,
    disconnected: AtomicBool,
    dropped_messages: AtomicU64,
}

impl ClientConnection {
    /// Create a connection in the `Connected` state.
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Arc<String>>) -> Self {
        let now = Instant::now();
        Self {
            id,
            tx,
            connected_at: now,
            last_seen: Mutex::new(now),
            disconnected: AtomicBool::new(false),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Enqueue a serialized frame without waiting.
    ///
    /// Fails with `Full` when the writer has fallen behind and `Closed` once
    /// the connection is disconnected or its writer has gone away. Every
    /// failure is counted in [`drop_count`](Self::drop_count).
    pub fn send(&self, frame: Arc<String>) -> Result<(), DeliveryError> {
        let result = if self.state() == ConnectionState::Disconnected {
            Err(DeliveryError::Closed)
        } else {
            self.tx.try_send(frame).map_err(|e| match e {
                TrySendError::Full(_) => DeliveryError::Full,
                TrySendError::Closed(_) => DeliveryError::Closed,
            })
        };
        if result.is_err() {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        if self.disconnected.load(Ordering::Acquire) {
            ConnectionState::Disconnected
        } else {
            ConnectionState::Connected
        }
    }

    /// Transition to `Disconnected`. Returns `false` if already there.
    pub fn mark_disconnected(&self) -> bool {
        !self.disconnected.swap(true, Ordering::AcqRel)
    }

    /// Record inbound activity.
    pub fn mark_alive(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    /// Time since the last inbound frame (or since connecting).
    pub fn last_seen_elapsed(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }

    /// Frames that could not be enqueued.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
