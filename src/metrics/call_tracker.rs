/// Market API call counter
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Counts outbound market API calls, in total and per window.
/// Observability only; nothing consults it to decide anything.
pub struct CallTracker {
    total_calls: AtomicU64,
    window_calls: AtomicU64,
    window: Duration,
    window_start: Mutex<Instant>,
}

impl CallTracker {
    pub fn new(window: Duration) -> Self {
        CallTracker {
            total_calls: AtomicU64::new(0),
            window_calls: AtomicU64::new(0),
            window,
            window_start: Mutex::new(Instant::now()),
        }
    }

    pub fn record_call(&self) {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        self.window_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Calls since the last reset, restarting the window only once it has
    /// fully elapsed. Returns 0 while the window is still open.
    pub async fn get_and_reset_window(&self) -> u64 {
        let mut window_start = self.window_start.lock().await;
        let now = Instant::now();

        if now.duration_since(*window_start) >= self.window {
            *window_start = now;
            self.window_calls.swap(0, Ordering::Relaxed)
        } else {
            0
        }
    }

    pub fn total_calls(&self) -> u64 {
        self.total_calls.load(Ordering::Relaxed)
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for CallTracker {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_window_resets_only_after_elapsed() {
        let tracker = CallTracker::new(Duration::from_secs(60));

        tracker.record_call();
        tracker.record_call();
        tracker.record_call();

        // Window still open
        assert_eq!(tracker.get_and_reset_window().await, 0);
        assert_eq!(tracker.total_calls(), 3);

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(tracker.get_and_reset_window().await, 3);

        // Fresh window
        tracker.record_call();
        assert_eq!(tracker.get_and_reset_window().await, 0);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(tracker.get_and_reset_window().await, 1);
        assert_eq!(tracker.total_calls(), 4);
    }

    #[tokio::test]
    async fn test_concurrent_recording() {
        let tracker = std::sync::Arc::new(CallTracker::default());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let tracker = std::sync::Arc::clone(&tracker);
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    tracker.record_call();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(tracker.total_calls(), 800);
    }
}
