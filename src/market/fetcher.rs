/// Fetch contracts between the service and a market data source
use futures_util::future::BoxFuture;

use crate::error::Result;
use crate::types::{ChartData, Currency, MarketFragment};

/// One request per call, no retries. Implementations classify every failure
/// into a `FeedError` and never return partial results.
pub trait MarketFetcher: Send + Sync {
    fn fetch(&self, currency: Currency) -> BoxFuture<'_, Result<Vec<MarketFragment>>>;
}

/// On-demand OHLC history for a single asset
pub trait ChartFetcher: Send + Sync {
    fn chart(&self, coin_id: String, currency: Currency, days: u32) -> BoxFuture<'_, Result<ChartData>>;
}
