//! Graceful shutdown coordination.
//!
//! One `CancellationToken` fans out to the HTTP server and every connection
//! task; a `TaskTracker` lets shutdown wait for those tasks to drain.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

/// Coordinates shutdown across the server and its connection tasks.
pub struct ShutdownCoordinator {
    token: CancellationToken,
    tracker: TaskTracker,
}

impl ShutdownCoordinator {
    /// Create a coordinator with nothing tracked.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// A clone of the shutdown token.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Wrap a future so shutdown waits for it.
    pub fn track<F>(&self, future: F) -> impl Future<Output = F::Output> + use<F>
    where
        F: Future,
    {
        self.tracker.track_future(future)
    }

    /// Signal shutdown. Idempotent.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Signal shutdown and wait up to `timeout` for tracked tasks.
    ///
    /// Returns `true` if every task finished in time.
    pub async fn graceful_shutdown(&self, timeout: Duration) -> bool {
        self.shutdown();
        let _ = self.tracker.close();
        info!(
            tasks = self.tracker.len(),
            timeout_secs = timeout.as_secs(),
            "waiting for connection tasks to finish"
        );

        if tokio::time::timeout(timeout, self.tracker.wait()).await.is_ok() {
            info!("all connection tasks finished");
            true
        } else {
            warn!(
                remaining = self.tracker.len(),
                "shutdown timed out after {timeout:?}"
            );
            false
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
