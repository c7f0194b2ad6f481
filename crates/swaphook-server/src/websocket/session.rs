//! Lifecycle of one WebSocket subscriber, from upgrade through disconnect.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures::{Sink, SinkExt, Stream, StreamExt};
use metrics::{counter, gauge};
use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::broadcast::{BroadcastHub, Subscription};
use super::connection::ClientConnection;
use super::heartbeat::{HeartbeatResult, run_heartbeat};
use crate::config::ServerConfig;
use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_DISCONNECTIONS_TOTAL};

/// Timing knobs for a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionTimings {
    /// Ping and liveness-check interval.
    pub heartbeat_interval: Duration,
    /// Silence tolerated before disconnecting.
    pub heartbeat_timeout: Duration,
    /// Bound on each socket write.
    pub send_timeout: Duration,
}

impl From<&ServerConfig> for SessionTimings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            heartbeat_interval: config.heartbeat_interval(),
            heartbeat_timeout: config.heartbeat_timeout(),
            send_timeout: config.send_timeout(),
        }
    }
}

/// Why a session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Close frame or end of stream from the client.
    ClientClosed,
    /// Transport error on read or write.
    SocketError,
    /// A socket write did not complete within the send timeout.
    SendTimeout,
    /// No inbound frames within the heartbeat timeout.
    HeartbeatTimeout,
    /// The hub dropped the connection's queue.
    QueueClosed,
    /// Server shutdown.
    Shutdown,
}

impl DisconnectReason {
    /// Stable label for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClientClosed => "client_closed",
            Self::SocketError => "socket_error",
            Self::SendTimeout => "send_timeout",
            Self::HeartbeatTimeout => "heartbeat_timeout",
            Self::QueueClosed => "queue_closed",
            Self::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run a subscriber's session until it disconnects.
///
/// Three loops race: the writer drains the queue and sends Pings, the reader
/// records inbound activity, and the heartbeat watches for silence. The first
/// to finish ends the session, after which the subscriber is removed from
/// the hub.
#[instrument(skip_all, fields(conn_id = %subscription.connection.id))]
pub async fn run_ws_session(
    socket: WebSocket,
    subscription: Subscription,
    hub: Arc<BroadcastHub>,
    timings: SessionTimings,
    shutdown: CancellationToken,
) -> DisconnectReason {
    let Subscription {
        connection,
        mut receiver,
    } = subscription;
    let (mut sink, mut stream) = socket.split();

    info!("client connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    let heartbeat_cancel = shutdown.child_token();
    let reason = tokio::select! {
        r = write_loop(&mut sink, &mut receiver, timings.heartbeat_interval, timings.send_timeout) => r,
        r = read_loop(&mut stream, &connection) => r,
        r = run_heartbeat(
            connection.clone(),
            timings.heartbeat_interval,
            timings.heartbeat_timeout,
            heartbeat_cancel.clone(),
        ) => match r {
            HeartbeatResult::TimedOut => DisconnectReason::HeartbeatTimeout,
            HeartbeatResult::Cancelled => DisconnectReason::Shutdown,
        },
    };
    heartbeat_cancel.cancel();

    if matches!(
        reason,
        DisconnectReason::Shutdown | DisconnectReason::HeartbeatTimeout
    ) {
        let _ = time::timeout(timings.send_timeout, sink.send(Message::Close(None))).await;
    }

    let _ = hub.unsubscribe(&connection.id).await;
    finish(&connection, reason);
    reason
}

fn finish(connection: &ClientConnection, reason: DisconnectReason) {
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    info!(
        reason = %reason,
        duration_ms = u64::try_from(connection.age().as_millis()).unwrap_or(u64::MAX),
        dropped = connection.drop_count(),
        "client disconnected"
    );
}

/// Forward queued frames to the socket and send a Ping every `ping_every`.
pub(crate) async fn write_loop<S>(
    sink: &mut S,
    receiver: &mut mpsc::Receiver<Arc<String>>,
    ping_every: Duration,
    send_timeout: Duration,
) -> DisconnectReason
where
    S: Sink<Message> + Unpin,
{
    let mut ping = time::interval_at(
        time::Instant::now() + ping_every,
        ping_every.max(Duration::from_millis(1)),
    );

    loop {
        let frame = tokio::select! {
            msg = receiver.recv() => match msg {
                Some(text) => Message::Text(text.as_str().into()),
                None => return DisconnectReason::QueueClosed,
            },
            _ = ping.tick() => Message::Ping(Bytes::new()),
        };

        match time::timeout(send_timeout, sink.send(frame)).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => return DisconnectReason::SocketError,
            Err(_) => {
                debug!(timeout = ?send_timeout, "socket send timed out");
                return DisconnectReason::SendTimeout;
            }
        }
    }
}

/// Consume inbound frames, marking the connection alive on each one.
///
/// Clients have nothing to say on this channel, so text and binary frames
/// are logged and dropped.
pub(crate) async fn read_loop<St, E>(stream: &mut St, connection: &ClientConnection) -> DisconnectReason
where
    St: Stream<Item = Result<Message, E>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        let Ok(msg) = frame else {
            return DisconnectReason::SocketError;
        };
        connection.mark_alive();
        match msg {
            Message::Text(text) => debug!(len = text.len(), "ignoring inbound text frame"),
            Message::Binary(data) => debug!(len = data.len(), "ignoring inbound binary frame"),
            Message::Close(_) => return DisconnectReason::ClientClosed,
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }
    DisconnectReason::ClientClosed
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use swaphook_core::ConnectionId;

    fn make_connection() -> ClientConnection {
        let (tx, _rx) = mpsc::channel(4);
        ClientConnection::new(ConnectionId::new(), tx)
    }

    #[test]
    fn timings_from_config() {
        let cfg = ServerConfig {
            heartbeat_interval_secs: 2,
            heartbeat_timeout_secs: 6,
            send_timeout_ms: 150,
            ..ServerConfig::default()
        };
        let t = SessionTimings::from(&cfg);
        assert_eq!(t.heartbeat_interval, Duration::from_secs(2));
        assert_eq!(t.heartbeat_timeout, Duration::from_secs(6));
        assert_eq!(t.send_timeout, Duration::from_millis(150));
    }

    #[test]
    fn reason_labels() {
        assert_eq!(DisconnectReason::HeartbeatTimeout.to_string(), "heartbeat_timeout");
        assert_eq!(DisconnectReason::ClientClosed.as_str(), "client_closed");
    }

    #[tokio::test]
    async fn writer_forwards_queued_frames_in_order() {
        let (frame_tx, mut frame_rx) = futures::channel::mpsc::unbounded::<Message>();
        let mut sink = frame_tx;
        let (tx, mut rx) = mpsc::channel(4);
        tx.send(Arc::new("one".into())).await.unwrap();
        tx.send(Arc::new("two".into())).await.unwrap();
        drop(tx);

        let reason = write_loop(&mut sink, &mut rx, Duration::from_secs(60), Duration::from_secs(1)).await;
        assert_eq!(reason, DisconnectReason::QueueClosed);

        assert_eq!(frame_rx.next().await, Some(Message::Text("one".into())));
        assert_eq!(frame_rx.next().await, Some(Message::Text("two".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn writer_sends_pings() {
        let (frame_tx, mut frame_rx) = futures::channel::mpsc::unbounded::<Message>();
        let mut sink = frame_tx;
        let (_tx, mut rx) = mpsc::channel::<Arc<String>>(4);

        let writer = tokio::spawn(async move {
            write_loop(&mut sink, &mut rx, Duration::from_millis(100), Duration::from_secs(1)).await
        });

        assert_eq!(frame_rx.next().await, Some(Message::Ping(Bytes::new())));
        assert_eq!(frame_rx.next().await, Some(Message::Ping(Bytes::new())));
        writer.abort();
    }

    #[tokio::test]
    async fn writer_stops_when_socket_is_gone() {
        let (frame_tx, frame_rx) = futures::channel::mpsc::unbounded::<Message>();
        drop(frame_rx);
        let mut sink = frame_tx;
        let (tx, mut rx) = mpsc::channel(4);
        tx.send(Arc::new("lost".into())).await.unwrap();

        let reason = write_loop(&mut sink, &mut rx, Duration::from_secs(60), Duration::from_secs(1)).await;
        assert_eq!(reason, DisconnectReason::SocketError);
    }

    #[tokio::test(start_paused = true)]
    async fn writer_gives_up_on_stalled_socket() {
        // bounded(0) parks the sender after one frame; nothing reads, so flush stalls
        let (frame_tx, _frame_rx) = futures::channel::mpsc::channel::<Message>(0);
        let mut sink = frame_tx;
        let (tx, mut rx) = mpsc::channel(4);
        tx.send(Arc::new("a".into())).await.unwrap();
        tx.send(Arc::new("b".into())).await.unwrap();

        let reason = write_loop(&mut sink, &mut rx, Duration::from_secs(60), Duration::from_millis(50)).await;
        assert_eq!(reason, DisconnectReason::SendTimeout);
    }

    #[tokio::test(start_paused = true)]
    async fn reader_marks_alive_and_ignores_text() {
        let conn = make_connection();
        time::advance(Duration::from_secs(30)).await;
        let mut frames = stream::iter(vec![
            Ok::<_, std::io::Error>(Message::Text("hi".into())),
            Ok(Message::Pong(Bytes::new())),
        ]);

        let reason = read_loop(&mut frames, &conn).await;
        assert_eq!(reason, DisconnectReason::ClientClosed);
        assert_eq!(conn.last_seen_elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn reader_stops_on_close_frame() {
        let conn = make_connection();
        let mut frames = stream::iter(vec![
            Ok::<_, std::io::Error>(Message::Close(None)),
            Ok(Message::Text("after close".into())),
        ]);
        assert_eq!(read_loop(&mut frames, &conn).await, DisconnectReason::ClientClosed);
        assert_eq!(frames.next().await.unwrap().unwrap(), Message::Text("after close".into()));
    }

    #[tokio::test]
    async fn reader_stops_on_socket_error() {
        let conn = make_connection();
        let mut frames = stream::iter(vec![Err::<Message, _>(std::io::Error::other("reset"))]);
        assert_eq!(read_loop(&mut frames, &conn).await, DisconnectReason::SocketError);
    }
}
