/// Configuration loading from TOML file
use std::path::Path;
use tracing::{info, warn};

use crate::error::{FeedError, Result};
use crate::types::Config;

/// Environment variable holding the market API credential
pub const API_KEY_ENV: &str = "COINGECKO_API_KEY";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| FeedError::ConfigError(format!("Failed to read config file: {}", e)))?;

    parse_config(&content)
}

/// Load from `path` if it exists, defaults otherwise. A non-blank
/// `COINGECKO_API_KEY` then replaces the file's credential.
pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Config> {
    let mut config = load_file_or_default(path.as_ref())?;
    config.apply_credential(std::env::var(API_KEY_ENV).ok());
    Ok(config)
}

fn load_file_or_default(path: &Path) -> Result<Config> {
    if !path.exists() {
        warn!("No config file at {} - using defaults", path.display());
        return Ok(Config::default());
    }

    let config = load_config(path)?;
    info!("Configuration loaded from {}", path.display());
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)
        .map_err(|e| FeedError::ConfigError(format!("Failed to parse config: {}", e)))?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &Config) -> Result<()> {
    if config.asset_ids.is_empty() || config.asset_ids.iter().any(|id| id.trim().is_empty()) {
        return Err(FeedError::ConfigError("asset_ids must list at least one non-empty id".to_string()));
    }

    if config.poll_interval_sec == 0 {
        return Err(FeedError::ConfigError("poll_interval_sec must be > 0".to_string()));
    }

    if config.call_window_sec == 0 {
        return Err(FeedError::ConfigError("call_window_sec must be > 0".to_string()));
    }

    if config.market_api_url.is_empty() || config.event_dispatcher_url.is_empty() {
        return Err(FeedError::ConfigError("market_api_url and event_dispatcher_url are required".to_string()));
    }

    if !config.event_path.starts_with('/') {
        return Err(FeedError::ConfigError(
            format!("event_path must start with '/': {}", config.event_path)
        ));
    }

    Ok(())
}
