/// Ordered, one-at-a-time forwarding of consolidated batches
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::sink::EventSink;
use super::types::EventEnvelope;
use crate::error::FeedError;
use crate::types::CanonicalAsset;
use crate::utils::batch_fingerprint;

enum Command {
    Publish(Vec<CanonicalAsset>),
    Close,
}

/// FIFO publisher. A single dispatcher task owns the sink, so at most one
/// delivery is in flight and batches reach the consumer in enqueue order.
pub struct EventPublisher {
    tx: mpsc::UnboundedSender<Command>,
    closed: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl EventPublisher {
    /// Spawn the dispatcher task. Must be called inside a tokio runtime.
    pub fn start(sink: Arc<dyn EventSink>, event_type: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(dispatch_loop(sink, event_type.into(), rx));

        EventPublisher {
            tx,
            closed: AtomicBool::new(false),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Queue a batch behind any pending one. Never blocks and never fails
    /// past this point; returns `false` if the publisher is closed.
    pub fn publish(&self, assets: Vec<CanonicalAsset>) -> bool {
        if self.closed.load(Ordering::Acquire) {
            warn!("Dropping batch of {} assets: {}", assets.len(), FeedError::PublisherClosed);
            return false;
        }

        let count = assets.len();
        match self.tx.send(Command::Publish(assets)) {
            Ok(()) => {
                debug!("Queued batch of {} assets", count);
                true
            }
            Err(_) => {
                warn!("Dropping batch of {} assets: {}", count, FeedError::PublisherClosed);
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stop intake, deliver what is already queued, then release the sink.
    /// Later calls are no-ops.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.tx.send(Command::Close);

        let worker = self.worker.lock().await.take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!("Publisher dispatcher task failed: {}", e);
            }
        }
        info!("Event publisher closed");
    }
}

async fn dispatch_loop(
    sink: Arc<dyn EventSink>,
    event_type: String,
    mut rx: mpsc::UnboundedReceiver<Command>,
) {
    // After `Close` the channel stops accepting sends, but batches that
    // slipped in before that are still delivered.
    while let Some(command) = rx.recv().await {
        let assets = match command {
            Command::Publish(assets) => assets,
            Command::Close => {
                rx.close();
                continue;
            }
        };

        let body = match EventEnvelope::new(&event_type, &assets).to_json() {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to publish data: {} ({})", e, e.error_code());
                continue;
            }
        };
        let fingerprint = batch_fingerprint(&body);

        match sink.deliver(body).await {
            Ok(()) => {
                info!(fingerprint = %fingerprint, "Published {} assets", assets.len());
            }
            Err(e) => {
                error!(
                    fingerprint = %fingerprint,
                    "Failed to publish data: {} ({})",
                    e,
                    e.error_code()
                );
            }
        }
    }
    debug!("Publisher dispatch loop exited");
}
