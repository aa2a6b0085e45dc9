/// CoinGecko REST client
use chrono::Utc;
use futures_util::future::BoxFuture;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

use crate::error::{FeedError, Result};
use crate::market::{ChartFetcher, MarketFetcher};
use crate::metrics::CallTracker;
use crate::types::{ChartData, Config, Currency, DataPoint, MarketFragment};

const API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// CoinGecko client: `/coins/markets` for a fixed asset set, plus on-demand
/// `/coins/{id}/ohlc` charts
pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
    asset_ids: String,
    api_key: Option<String>,
    tracker: Arc<CallTracker>,
}

impl CoinGeckoClient {
    pub fn new(config: &Config, tracker: Arc<CallTracker>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()
            .map_err(|e| FeedError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(CoinGeckoClient {
            client,
            base_url: config.market_api_url.trim_end_matches('/').to_string(),
            asset_ids: config.asset_ids.join(","),
            api_key: config.credential().map(str::to_string),
            tracker,
        })
    }

    /// Fetch the tracked assets quoted in `currency`
    pub async fn fetch_markets(&self, currency: Currency) -> Result<Vec<MarketFragment>> {
        let fragments: Vec<MarketFragment> = self
            .get_json(
                "/coins/markets",
                &[("vs_currency", currency.code()), ("ids", self.asset_ids.as_str())],
            )
            .await?;

        debug!("Fetched {} assets quoted in {}", fragments.len(), currency);
        Ok(fragments)
    }

    /// Fetch OHLC candles for `coin_id` over the last `days` days
    pub async fn fetch_chart(&self, coin_id: &str, currency: Currency, days: u32) -> Result<ChartData> {
        let days_param = days.to_string();
        let data_points: Vec<DataPoint> = self
            .get_json(
                &format!("/coins/{}/ohlc", coin_id),
                &[
                    ("vs_currency", currency.code()),
                    ("days", days_param.as_str()),
                    ("precision", "2"),
                ],
            )
            .await?;

        debug!("Fetched {} candles for {} in {}", data_points.len(), coin_id, currency);
        Ok(ChartData {
            coin_id: coin_id.to_string(),
            currency,
            timespan: days,
            data_points,
            timestamp: Utc::now().timestamp_millis(),
        })
    }

    /// Credential check, call accounting, request, status classification
    /// and decoding shared by every endpoint.
    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            error!("API key not found. Please set COINGECKO_API_KEY environment variable.");
            FeedError::MissingCredential("COINGECKO_API_KEY".to_string())
        })?;

        self.tracker.record_call();

        let response = self.client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .header("accept", "application/json")
            .header(API_KEY_HEADER, api_key)
            .send()
            .await
            .map_err(FeedError::from_transport)?;

        let status = response.status();
        let body = response.text().await.map_err(FeedError::from_transport)?;

        if !status.is_success() {
            return Err(FeedError::from_status(status.as_u16(), body));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

impl MarketFetcher for CoinGeckoClient {
    fn fetch(&self, currency: Currency) -> BoxFuture<'_, Result<Vec<MarketFragment>>> {
        Box::pin(self.fetch_markets(currency))
    }
}

impl ChartFetcher for CoinGeckoClient {
    fn chart(&self, coin_id: String, currency: Currency, days: u32) -> BoxFuture<'_, Result<ChartData>> {
        Box::pin(async move { self.fetch_chart(&coin_id, currency, days).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_credential_short_circuits() {
        let tracker = Arc::new(CallTracker::default());
        let config = Config {
            api_key: None,
            // Unroutable on purpose: the request must never be attempted
            market_api_url: "http://127.0.0.1:1".to_string(),
            ..Config::default()
        };
        let client = CoinGeckoClient::new(&config, Arc::clone(&tracker)).unwrap();

        let err = client.fetch(Currency::Usd).await.unwrap_err();

        assert!(matches!(err, FeedError::MissingCredential(_)));
        assert_eq!(tracker.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_chart_without_credential_short_circuits() {
        let tracker = Arc::new(CallTracker::default());
        let config = Config {
            api_key: Some(String::new()),
            market_api_url: "http://127.0.0.1:1".to_string(),
            ..Config::default()
        };
        let client = CoinGeckoClient::new(&config, Arc::clone(&tracker)).unwrap();

        let err = client.chart("bitcoin".to_string(), Currency::Eur, 7).await.unwrap_err();

        assert!(err.is_configuration());
        assert_eq!(tracker.total_calls(), 0);
    }
}
