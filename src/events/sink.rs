/// Delivery of serialized event bodies to the downstream consumer
use futures_util::future::BoxFuture;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::error::{FeedError, Result};

/// One delivery per call; no retries
pub trait EventSink: Send + Sync {
    fn deliver(&self, body: String) -> BoxFuture<'_, Result<()>>;
}

/// POSTs JSON bodies to a fixed endpoint
pub struct HttpEventSink {
    client: Client,
    endpoint: String,
}

impl HttpEventSink {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FeedError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(HttpEventSink { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, body: String) -> Result<()> {
        let response = self.client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(FeedError::from_transport)?;

        let status = response.status();
        debug!("Downstream response: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::from_status(status.as_u16(), body));
        }

        Ok(())
    }
}

impl EventSink for HttpEventSink {
    fn deliver(&self, body: String) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.post(body))
    }
}
