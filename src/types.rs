/// Core type definitions for the market feed
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Supported quote currency. Declaration order is catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Usd,
    Eur,
}

impl Currency {
    /// The fixed catalog, in iteration order
    pub const ALL: [Currency; 2] = [Currency::Usd, Currency::Eur];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "usd",
            Currency::Eur => "eur",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Currency::ALL
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(code))
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// One optional value per catalog currency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyValue(BTreeMap<Currency, Option<f64>>);

impl CurrencyValue {
    /// Every catalog currency present, all unobserved
    pub fn empty() -> Self {
        CurrencyValue(Currency::ALL.into_iter().map(|c| (c, None)).collect())
    }

    /// Null everywhere except `currency`
    pub fn seeded(currency: Currency, value: Option<f64>) -> Self {
        let mut cv = Self::empty();
        cv.set(currency, value);
        cv
    }

    pub fn set(&mut self, currency: Currency, value: Option<f64>) {
        self.0.insert(currency, value);
    }

    pub fn get(&self, currency: Currency) -> Option<f64> {
        self.0.get(&currency).copied().flatten()
    }

    pub fn contains(&self, currency: Currency) -> bool {
        self.0.contains_key(&currency)
    }
}

impl Default for CurrencyValue {
    fn default() -> Self {
        Self::empty()
    }
}

/// One asset as reported by the market API for a single quote currency
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MarketFragment {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub fully_diluted_valuation: Option<f64>,
    #[serde(default)]
    pub total_volume: Option<f64>,
    #[serde(default)]
    pub high_24h: Option<f64>,
    #[serde(default)]
    pub low_24h: Option<f64>,
    #[serde(default)]
    pub price_change_24h: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    pub market_cap_change_24h: Option<f64>,
    #[serde(default)]
    pub market_cap_change_percentage_24h: Option<f64>,
    #[serde(default)]
    pub circulating_supply: Option<f64>,
    #[serde(default)]
    pub total_supply: Option<f64>,
    #[serde(default)]
    pub max_supply: Option<f64>,
    #[serde(default)]
    pub ath: Option<f64>,
    #[serde(default)]
    pub ath_change_percentage: Option<f64>,
    #[serde(default)]
    pub ath_date: Option<String>,
    #[serde(default)]
    pub atl: Option<f64>,
    #[serde(default)]
    pub atl_change_percentage: Option<f64>,
    #[serde(default)]
    pub atl_date: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

/// Merged multi-currency view of one asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalAsset {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub image: Option<String>,
    pub prices: CurrencyValue,
    pub market_cap: CurrencyValue,
    pub market_cap_rank: Option<u32>,
    pub fully_diluted_valuation: CurrencyValue,
    pub total_volume: CurrencyValue,
    pub high_24h: CurrencyValue,
    pub low_24h: CurrencyValue,
    pub price_change_24h: CurrencyValue,
    pub price_change_percentage_24h: Option<f64>,
    pub market_cap_change_24h: CurrencyValue,
    pub market_cap_change_percentage_24h: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub max_supply: Option<f64>,
    pub ath: CurrencyValue,
    pub ath_change_percentage: Option<f64>,
    pub ath_date: Option<String>,
    pub atl: CurrencyValue,
    pub atl_change_percentage: Option<f64>,
    pub atl_date: Option<String>,
    pub last_updated: Option<String>,
}

/// One OHLC candle. The market API sends `[timestamp_ms, open, high, low, close]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(i64, f64, f64, f64, f64)")]
pub struct DataPoint {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl From<(i64, f64, f64, f64, f64)> for DataPoint {
    fn from((timestamp, open, high, low, close): (i64, f64, f64, f64, f64)) -> Self {
        DataPoint { timestamp, open, high, low, close }
    }
}

/// Candles for one asset over the last `timespan` days
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub coin_id: String,
    pub currency: Currency,
    pub timespan: u32,
    pub data_points: Vec<DataPoint>,
    /// Fetch time, epoch milliseconds
    pub timestamp: i64,
}

/// Poller run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Idle,
    Running,
}

impl RunState {
    pub fn as_str(&self) -> &str {
        match self {
            RunState::Idle => "stopped",
            RunState::Running => "running",
        }
    }
}

/// Configuration for the market feed
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    // Tracked Assets
    pub asset_ids: Vec<String>,

    // Polling
    pub poll_interval_sec: u64,

    // Market API
    pub market_api_url: String,
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub api_key: Option<String>,

    // Downstream Consumer
    pub event_dispatcher_url: String,
    pub event_path: String,
    pub event_type: String,

    // Control Surface
    pub control_bind: String,
    pub autostart: bool,

    // Metrics
    pub call_window_sec: u64,

    // Logging
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            asset_ids: vec!["bitcoin".to_string(), "ethereum".to_string()],
            poll_interval_sec: 300,
            market_api_url: "https://api.coingecko.com/api/v3".to_string(),
            request_timeout_ms: 10_000,
            connect_timeout_ms: 5_000,
            api_key: None,
            event_dispatcher_url: "http://event-dispatcher:3000".to_string(),
            event_path: "/realtime/events".to_string(),
            event_type: "CRYPTO_UPDATE".to_string(),
            control_bind: "0.0.0.0:8080".to_string(),
            autostart: false,
            call_window_sec: 60,
            log_level: "coinfeed=debug,info".to_string(),
        }
    }
}

impl Config {
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_interval_sec)
    }

    pub fn call_window(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.call_window_sec)
    }

    pub fn event_endpoint(&self) -> String {
        format!(
            "{}{}",
            self.event_dispatcher_url.trim_end_matches('/'),
            self.event_path
        )
    }

    /// Credential, treating an empty string as absent
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Overlay a credential from outside the config file. A blank value
    /// never replaces a configured key.
    pub fn apply_credential(&mut self, key: Option<String>) {
        if let Some(key) = key.filter(|key| !key.trim().is_empty()) {
            self.api_key = Some(key);
        }
    }
}
