pub mod fetcher;
pub mod coingecko;

pub use fetcher::{ChartFetcher, MarketFetcher};
pub use coingecko::CoinGeckoClient;
