/// Poll loop lifecycle: start/stop/status and the latest committed snapshot
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::aggregation::{aggregate, Aggregation};
use crate::events::EventPublisher;
use crate::market::MarketFetcher;
use crate::types::{CanonicalAsset, Currency, RunState};

/// One committed cycle
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub cycle: u64,
    pub cycle_id: Uuid,
    pub committed_at: DateTime<Utc>,
    pub failed_currencies: Vec<Currency>,
    pub assets: Vec<CanonicalAsset>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

struct PollLoop {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct Shared {
    fetcher: Arc<dyn MarketFetcher>,
    publisher: Arc<EventPublisher>,
    catalog: Vec<Currency>,
    period: Duration,
    latest: RwLock<Option<Arc<Snapshot>>>,
    cycle_seq: AtomicU64,
}

/// Owns the background poll task. All methods are safe to call
/// concurrently, including while a cycle is mid-flight.
pub struct PollManager {
    shared: Arc<Shared>,
    poll_loop: Mutex<Option<PollLoop>>,
}

impl PollManager {
    pub fn new(
        fetcher: Arc<dyn MarketFetcher>,
        publisher: Arc<EventPublisher>,
        period: Duration,
    ) -> Self {
        PollManager {
            shared: Arc::new(Shared {
                fetcher,
                publisher,
                catalog: Currency::ALL.to_vec(),
                period,
                latest: RwLock::new(None),
                cycle_seq: AtomicU64::new(0),
            }),
            poll_loop: Mutex::new(None),
        }
    }

    /// Begin cycling. No-op if a loop is already live.
    pub async fn start(&self) -> StartOutcome {
        let mut poll_loop = self.poll_loop.lock().await;
        if let Some(current) = poll_loop.as_ref() {
            if !current.handle.is_finished() {
                debug!("Poll loop already running");
                return StartOutcome::AlreadyRunning;
            }
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_loop(Arc::clone(&self.shared), cancel.clone()));
        *poll_loop = Some(PollLoop { cancel, handle });

        info!(
            period_sec = self.shared.period.as_secs(),
            "Poll loop started"
        );
        StartOutcome::Started
    }

    /// Cancel the loop. An in-flight fetch is abandoned at its next
    /// suspension point and nothing from it is committed. Returns whether a
    /// loop was running.
    pub async fn stop(&self) -> bool {
        let poll_loop = self.poll_loop.lock().await.take();
        match poll_loop {
            Some(poll_loop) => {
                poll_loop.cancel.cancel();
                let was_running = !poll_loop.handle.is_finished();
                info!("Poll loop stopped");
                was_running
            }
            None => false,
        }
    }

    pub async fn status(&self) -> RunState {
        let poll_loop = self.poll_loop.lock().await;
        match poll_loop.as_ref() {
            Some(current) if !current.handle.is_finished() => RunState::Running,
            _ => RunState::Idle,
        }
    }

    /// Most recently committed snapshot, `None` before the first commit
    pub async fn latest(&self) -> Option<Arc<Snapshot>> {
        self.shared.latest.read().await.clone()
    }

    /// Queue the latest snapshot for publishing again. Holds the read lock
    /// while enqueuing so it cannot jump ahead of a newer commit.
    pub async fn republish_latest(&self) -> bool {
        let latest = self.shared.latest.read().await;
        match latest.as_ref() {
            Some(snapshot) => self.shared.publisher.publish(snapshot.assets.clone()),
            None => false,
        }
    }
}

enum CycleEnd {
    Continue,
    Cancelled,
}

async fn run_loop(shared: Arc<Shared>, cancel: CancellationToken) {
    loop {
        if cancel.is_cancelled() {
            break;
        }

        let started = Instant::now();
        let cycle = shared.cycle_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let cycle_id = Uuid::new_v4();
        let span = info_span!("cycle", cycle, cycle_id = %cycle_id);

        match run_cycle(&shared, &cancel, cycle, cycle_id).instrument(span).await {
            CycleEnd::Continue => {}
            CycleEnd::Cancelled => break,
        }

        let remaining = shared.period.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            warn!(cycle, "Cycle overran the poll period - starting next cycle now");
            continue;
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(remaining) => {}
        }
    }
    debug!("Poll loop exited");
}

async fn run_cycle(
    shared: &Shared,
    cancel: &CancellationToken,
    cycle: u64,
    cycle_id: Uuid,
) -> CycleEnd {
    debug!("Cycle starting");

    let aggregation = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            info!("Cycle cancelled before commit");
            return CycleEnd::Cancelled;
        }
        aggregation = aggregate(&shared.catalog, shared.fetcher.as_ref()) => aggregation,
    };

    commit(shared, cycle, cycle_id, aggregation).await;
    CycleEnd::Continue
}

/// Replace the latest snapshot and hand it to the publisher under one write
/// lock, so publish order is commit order. Older cycles never overwrite newer.
async fn commit(shared: &Shared, cycle: u64, cycle_id: Uuid, aggregation: Aggregation) -> bool {
    let mut latest = shared.latest.write().await;
    if let Some(current) = latest.as_ref() {
        if current.cycle >= cycle {
            warn!(current = current.cycle, "Discarding stale cycle result");
            return false;
        }
    }

    let snapshot = Arc::new(Snapshot {
        cycle,
        cycle_id,
        committed_at: Utc::now(),
        failed_currencies: aggregation.failed,
        assets: aggregation.map.into_assets(),
    });

    info!(
        assets = snapshot.assets.len(),
        failed = snapshot.failed_currencies.len(),
        "Cycle committed"
    );
    shared.publisher.publish(snapshot.assets.clone());
    *latest = Some(snapshot);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::aggregator::tests::ScriptedFetcher;
    use crate::aggregation::fold::tests::fragment;
    use crate::error::FeedError;
    use crate::events::publisher::tests::RecordingSink;

    const PERIOD: Duration = Duration::from_secs(60);

    fn bitcoin_fetcher() -> ScriptedFetcher {
        ScriptedFetcher::default()
            .respond(Currency::Usd, vec![fragment("bitcoin", "btc", 102775.0)])
            .respond(Currency::Eur, vec![fragment("bitcoin", "btc", 94553.0)])
    }

    fn manager_with(fetcher: Arc<ScriptedFetcher>, sink: Arc<RecordingSink>, period: Duration) -> PollManager {
        let publisher = Arc::new(EventPublisher::start(sink, "CRYPTO_UPDATE"));
        PollManager::new(fetcher, publisher, period)
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_start_runs_one_loop() {
        let fetcher = Arc::new(bitcoin_fetcher());
        let manager = manager_with(fetcher.clone(), Arc::new(RecordingSink::default()), PERIOD);

        assert_eq!(manager.start().await, StartOutcome::Started);
        assert_eq!(manager.start().await, StartOutcome::AlreadyRunning);
        assert_eq!(manager.status().await, RunState::Running);

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(fetcher.calls(), 2);

        tokio::time::sleep(PERIOD).await;
        assert_eq!(fetcher.calls(), 4);

        manager.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_then_start_resumes() {
        let fetcher = Arc::new(bitcoin_fetcher());
        let manager = manager_with(fetcher.clone(), Arc::new(RecordingSink::default()), PERIOD);

        manager.start().await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(fetcher.calls(), 2);

        assert!(manager.stop().await);
        assert_eq!(manager.status().await, RunState::Idle);
        assert!(!manager.stop().await);

        // Nothing runs while stopped
        tokio::time::sleep(PERIOD * 10).await;
        assert_eq!(fetcher.calls(), 2);

        assert_eq!(manager.start().await, StartOutcome::Started);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(fetcher.calls(), 4);
        assert_eq!(manager.latest().await.unwrap().cycle, 2);

        manager.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_latest_is_empty_until_first_commit() {
        let fetcher = Arc::new(bitcoin_fetcher().delay(Currency::Eur, Duration::from_secs(5)));
        let manager = manager_with(fetcher, Arc::new(RecordingSink::default()), PERIOD);

        assert!(manager.latest().await.is_none());
        assert!(!manager.republish_latest().await);

        manager.start().await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        // Still fetching EUR
        assert!(manager.latest().await.is_none());

        tokio::time::sleep(Duration::from_secs(5)).await;
        let snapshot = manager.latest().await.unwrap();
        assert_eq!(snapshot.cycle, 1);
        assert_eq!(snapshot.assets.len(), 1);
        assert_eq!(snapshot.assets[0].prices.get(Currency::Usd), Some(102775.0));
        assert_eq!(snapshot.assets[0].prices.get(Currency::Eur), Some(94553.0));

        manager.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_failure_still_commits_and_publishes() {
        let fetcher = Arc::new(
            bitcoin_fetcher().fail(Currency::Eur, || FeedError::NetworkError("unreachable".to_string())),
        );
        let sink = Arc::new(RecordingSink::default());
        let publisher = Arc::new(EventPublisher::start(sink.clone(), "CRYPTO_UPDATE"));
        let manager = PollManager::new(fetcher, Arc::clone(&publisher), PERIOD);

        manager.start().await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        manager.stop().await;
        publisher.close().await;

        let snapshot = manager.latest().await.unwrap();
        assert_eq!(snapshot.failed_currencies, vec![Currency::Eur]);
        let bitcoin = &snapshot.assets[0];
        assert_eq!(bitcoin.prices.get(Currency::Usd), Some(102775.0));
        assert_eq!(bitcoin.prices.get(Currency::Eur), None);

        let bodies = sink.bodies();
        assert_eq!(bodies.len(), 1);
        let body: serde_json::Value = serde_json::from_str(&bodies[0]).unwrap();
        assert_eq!(body["payload"][0]["prices"]["usd"], 102775.0);
        assert!(body["payload"][0]["prices"]["eur"].is_null());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrun_starts_one_immediate_cycle_without_backlog() {
        let fetcher = Arc::new(bitcoin_fetcher().delay(Currency::Usd, Duration::from_secs(3)));
        let manager = manager_with(fetcher.clone(), Arc::new(RecordingSink::default()), Duration::from_secs(1));

        manager.start().await;
        // Cycles start at t=0, t=3, t=6
        tokio::time::sleep(Duration::from_millis(7_500)).await;

        assert_eq!(fetcher.calls(), 6);
        assert_eq!(manager.latest().await.unwrap().cycle, 2);

        manager.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_mid_fetch_commits_nothing() {
        let fetcher = Arc::new(bitcoin_fetcher().delay(Currency::Usd, Duration::from_secs(10)));
        let sink = Arc::new(RecordingSink::default());
        let manager = manager_with(fetcher.clone(), sink.clone(), PERIOD);

        manager.start().await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(manager.stop().await);

        tokio::time::sleep(PERIOD * 2).await;
        assert!(manager.latest().await.is_none());
        assert_eq!(fetcher.calls(), 2);
        assert!(sink.bodies().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_republish_latest_enqueues_same_batch() {
        let sink = Arc::new(RecordingSink::default());
        let publisher = Arc::new(EventPublisher::start(sink.clone(), "CRYPTO_UPDATE"));
        let manager = PollManager::new(Arc::new(bitcoin_fetcher()), Arc::clone(&publisher), PERIOD);

        manager.start().await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(manager.republish_latest().await);
        manager.stop().await;
        publisher.close().await;

        let bodies = sink.bodies();
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[0], bodies[1]);
    }
}
