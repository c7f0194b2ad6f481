//! Liveness monitoring for a single connection.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use super::connection::ClientConnection;

/// Outcome of the heartbeat loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatResult {
    /// No inbound frame within the silence allowance.
    TimedOut,
    /// The heartbeat was cancelled externally.
    Cancelled,
}

/// How long a connection may stay silent before it is dropped.
///
/// The configured timeout, but never less than one and a half ping
/// intervals: a Pong to the most recent Ping must always have time to land.
pub fn silence_allowance(interval: Duration, timeout: Duration) -> Duration {
    timeout.max(interval + interval / 2)
}

/// Drop the connection once it has been silent for the silence allowance.
///
/// The writer task sends the Pings and the reader refreshes `last_seen` on
/// every inbound frame; this loop only measures the silence.
pub async fn run_heartbeat(
    connection: Arc<ClientConnection>,
    interval: Duration,
    timeout: Duration,
    cancel: CancellationToken,
) -> HeartbeatResult {
    let allowance = silence_allowance(interval, timeout);
    let mut check_interval = time::interval(interval.max(Duration::from_millis(1)));

    loop {
        tokio::select! {
            _ = check_interval.tick() => {
                if connection.last_seen_elapsed() >= allowance {
                    return HeartbeatResult::TimedOut;
                }
            }
            () = cancel.cancelled() => {
                return HeartbeatResult::Cancelled;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swaphook_core::ConnectionId;
    use tokio::sync::mpsc;

    fn make_connection() -> Arc<ClientConnection> {
        let (tx, _rx) = mpsc::channel(4);
        Arc::new(ClientConnection::new(ConnectionId::new(), tx))
    }

    #[test]
    fn allowance_covers_a_ping_round_trip() {
        let secs = Duration::from_secs;
        assert_eq!(silence_allowance(secs(25), secs(60)), secs(60));
        assert_eq!(silence_allowance(secs(2), secs(3)), secs(3));
        assert_eq!(silence_allowance(secs(1), secs(1)), Duration::from_millis(1500));
        assert_eq!(silence_allowance(secs(60), secs(10)), secs(90));
    }

    #[tokio::test]
    async fn cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = run_heartbeat(
            make_connection(),
            Duration::from_secs(100),
            Duration::from_secs(300),
            cancel,
        )
        .await;
        assert_eq!(result, HeartbeatResult::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_connection_times_out() {
        let conn = make_connection();
        let started = time::Instant::now();

        let result = run_heartbeat(
            conn,
            Duration::from_millis(100),
            Duration::from_millis(300),
            CancellationToken::new(),
        )
        .await;
        assert_eq!(result, HeartbeatResult::TimedOut);
        assert_eq!(started.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn pong_every_interval_survives_short_timeout() {
        // timeout below two intervals: one answered Ping per interval is enough
        let conn = make_connection();
        let cancel = CancellationToken::new();
        let interval = Duration::from_secs(2);
        let handle = tokio::spawn(run_heartbeat(
            conn.clone(),
            interval,
            Duration::from_secs(3),
            cancel.clone(),
        ));

        for _ in 0..10 {
            time::sleep(interval).await;
            conn.mark_alive();
        }
        assert!(!handle.is_finished());

        cancel.cancel();
        assert_eq!(handle.await.unwrap(), HeartbeatResult::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn activity_stops_then_times_out() {
        let conn = make_connection();
        let handle = tokio::spawn(run_heartbeat(
            conn.clone(),
            Duration::from_millis(100),
            Duration::from_millis(300),
            CancellationToken::new(),
        ));

        for _ in 0..5 {
            time::sleep(Duration::from_millis(100)).await;
            conn.mark_alive();
        }
        let last_activity = time::Instant::now();

        assert_eq!(handle.await.unwrap(), HeartbeatResult::TimedOut);
        assert!(last_activity.elapsed() >= Duration::from_millis(300));
    }
}
