/// Periodic call-rate logging
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::CallTracker;

/// Log the tracker's window count every `interval` until cancelled
pub fn spawn_reporter(
    tracker: Arc<CallTracker>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Call-rate reporter stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let calls = tracker.get_and_reset_window().await;
                    info!(
                        calls_in_window = calls,
                        total_calls = tracker.total_calls(),
                        "Market API calls in the last {}s",
                        tracker.window().as_secs()
                    );
                }
            }
        }
    })
}
