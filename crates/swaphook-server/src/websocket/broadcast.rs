//! Fan-out of channel events to every connected subscriber.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::counter;
use swaphook_core::{ChannelEvent, ConnectionId, DeliveryError};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, warn};

use super::connection::ClientConnection;
use crate::metrics::{BROADCAST_DROPS_TOTAL, BROADCAST_EVENTS_TOTAL};

/// Default per-subscriber queue depth.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// A freshly registered subscriber: the hub-side handle plus the queue its
/// writer task drains.
pub struct Subscription {
    /// Handle shared with the hub.
    pub connection: Arc<ClientConnection>,
    /// Serialized frames addressed to this subscriber.
    pub receiver: mpsc::Receiver<Arc<String>>,
}

/// Outcome of one [`BroadcastHub::broadcast`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Subscribers in the set when the broadcast ran.
    pub recipients: usize,
    /// Frames enqueued.
    pub delivered: usize,
    /// Frames dropped because a queue was full or closed.
    pub dropped: usize,
}

/// The subscriber set.
///
/// Subscribe and unsubscribe take the write lock; broadcast holds the read
/// lock and never awaits a subscriber.
pub struct BroadcastHub {
    connections: RwLock<HashMap<ConnectionId, Arc<ClientConnection>>>,
    queue_capacity: usize,
}

impl BroadcastHub {
    /// Create an empty hub whose subscribers get `queue_capacity`-deep queues.
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Register a new subscriber and send it the greeting.
    ///
    /// The greeting goes to this subscriber only and is always the first
    /// frame in its queue.
    pub async fn subscribe(&self) -> Subscription {
        let subscription = self.open();
        let mut conns = self.connections.write().await;
        Self::register(&mut conns, &subscription.connection);
        subscription
    }

    /// Register a new subscriber unless `limit` subscribers already exist.
    ///
    /// The count check and the insert happen under one write lock, so
    /// concurrent callers can never push the set past `limit`.
    pub async fn try_subscribe(&self, limit: usize) -> Option<Subscription> {
        let mut conns = self.connections.write().await;
        if conns.len() >= limit {
            return None;
        }
        let subscription = self.open();
        Self::register(&mut conns, &subscription.connection);
        Some(subscription)
    }

    /// A connection with the greeting already queued, not yet in the set.
    fn open(&self) -> Subscription {
        let (tx, receiver) = mpsc::channel(self.queue_capacity);
        let connection = Arc::new(ClientConnection::new(ConnectionId::new(), tx));

        match ChannelEvent::greeting().to_json() {
            Ok(json) => {
                if let Err(e) = connection.send(Arc::new(json)) {
                    warn!(conn_id = %connection.id, error = %e, "failed to enqueue greeting");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize greeting"),
        }

        Subscription {
            connection,
            receiver,
        }
    }

    fn register(
        conns: &mut HashMap<ConnectionId, Arc<ClientConnection>>,
        connection: &Arc<ClientConnection>,
    ) {
        let _ = conns.insert(connection.id.clone(), connection.clone());
        debug!(conn_id = %connection.id, subscribers = conns.len(), "subscriber added");
    }

    /// Remove a subscriber and mark it disconnected. Idempotent.
    ///
    /// Returns `true` if the subscriber was present.
    pub async fn unsubscribe(&self, id: &ConnectionId) -> bool {
        let removed = self.connections.write().await.remove(id);
        match removed {
            Some(conn) => {
                let _ = conn.mark_disconnected();
                debug!(conn_id = %id, dropped = conn.drop_count(), "subscriber removed");
                true
            }
            None => false,
        }
    }

    /// Deliver `event` to every current subscriber, best-effort.
    ///
    /// The event is serialized once. A failed delivery to one subscriber is
    /// logged and counted but never affects the others.
    pub async fn broadcast(&self, event: &ChannelEvent) -> BroadcastReport {
        let json = match event.to_json() {
            Ok(j) => Arc::new(j),
            Err(e) => {
                warn!(event = %event.event, error = %e, "failed to serialize event");
                return BroadcastReport::default();
            }
        };

        let conns = self.connections.read().await;
        let mut report = BroadcastReport {
            recipients: conns.len(),
            ..BroadcastReport::default()
        };

        for conn in conns.values() {
            match conn.send(json.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.dropped += 1;
                    match e {
                        DeliveryError::Full => {
                            warn!(conn_id = %conn.id, event = %event.event, "subscriber queue full, dropping event");
                        }
                        DeliveryError::Closed => {
                            debug!(conn_id = %conn.id, event = %event.event, "subscriber closed, dropping event");
                        }
                    }
                }
            }
        }
        drop(conns);

        counter!(BROADCAST_EVENTS_TOTAL, "event" => event.event.as_str()).increment(1);
        if report.dropped > 0 {
            counter!(BROADCAST_DROPS_TOTAL).increment(report.dropped as u64);
        }
        debug!(
            event = %event.event,
            recipients = report.recipients,
            delivered = report.delivered,
            dropped = report.dropped,
            "broadcast event"
        );
        report
    }

    /// Number of registered subscribers.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}
