/// One aggregation cycle over the currency catalog
use futures_util::future::join_all;
use tracing::{debug, warn};

use super::fold::{fold, AggregationMap};
use crate::market::MarketFetcher;
use crate::types::Currency;

/// Result of one pass over the catalog
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub map: AggregationMap,
    pub failed: Vec<Currency>,
}

/// Fetch every catalog currency and fold the results in catalog order.
///
/// Fetches run concurrently; `join_all` hands results back in input order, so
/// the fold sees the same sequence regardless of which request finished
/// first. A failed currency is logged and skipped.
pub async fn aggregate(catalog: &[Currency], fetcher: &dyn MarketFetcher) -> Aggregation {
    let results = join_all(catalog.iter().map(|&currency| fetcher.fetch(currency))).await;

    let mut aggregation = Aggregation::default();
    for (&currency, result) in catalog.iter().zip(results) {
        match result {
            Ok(fragments) => {
                debug!("Folding {} fragments for {}", fragments.len(), currency);
                aggregation.map = fold(aggregation.map, currency, fragments);
            }
            Err(e) => {
                warn!(
                    currency = currency.code(),
                    "Fetch failed: {} ({})",
                    e,
                    e.error_code()
                );
                aggregation.failed.push(currency);
            }
        }
    }

    aggregation
}
