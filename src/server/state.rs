use std::sync::Arc;

use crate::market::ChartFetcher;
use crate::metrics::CallTracker;
use crate::process::PollManager;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<PollManager>,
    pub tracker: Arc<CallTracker>,
    pub charts: Arc<dyn ChartFetcher>,
}

impl AppState {
    pub fn new(
        manager: Arc<PollManager>,
        tracker: Arc<CallTracker>,
        charts: Arc<dyn ChartFetcher>,
    ) -> Self {
        Self { manager, tracker, charts }
    }
}
