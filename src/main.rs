/// Main entry point for the market feed
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter};

use coinfeed::{
    config::{load_or_default, API_KEY_ENV},
    events::{EventPublisher, HttpEventSink},
    market::CoinGeckoClient,
    Config,
    metrics::{spawn_reporter, CallTracker},
    process::PollManager,
    server::{create_router, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    // Initialize logging before config so loader messages are kept.
    // RUST_LOG wins; otherwise the config's filter replaces the default.
    let env_filter = EnvFilter::try_from_default_env().ok();
    let filter_from_env = env_filter.is_some();
    let (filter, filter_handle) = reload::Layer::new(
        env_filter.unwrap_or_else(|| EnvFilter::new(Config::default().log_level)),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    info!("Starting market feed...");

    let config_path = std::env::var("CONFIG_PATH")
        .unwrap_or_else(|_| "config.toml".to_string());
    let config = load_or_default(&config_path)?;

    if !filter_from_env {
        if let Err(e) = filter_handle.reload(EnvFilter::new(&config.log_level)) {
            warn!("Failed to apply log_level {}: {}", config.log_level, e);
        }
    }
    if config.credential().is_none() {
        warn!("{} not set - every market fetch will fail until restart", API_KEY_ENV);
    }

    let tracker = Arc::new(CallTracker::new(config.call_window()));
    let fetcher = Arc::new(CoinGeckoClient::new(&config, Arc::clone(&tracker))?);

    let sink = Arc::new(HttpEventSink::new(
        config.event_endpoint(),
        Duration::from_millis(config.request_timeout_ms),
    )?);
    info!("Publishing to {}", sink.endpoint());
    let publisher = Arc::new(EventPublisher::start(sink, config.event_type.clone()));

    let manager = Arc::new(PollManager::new(
        fetcher.clone(),
        Arc::clone(&publisher),
        config.poll_interval(),
    ));

    let reporter_cancel = CancellationToken::new();
    let reporter = spawn_reporter(
        Arc::clone(&tracker),
        config.call_window(),
        reporter_cancel.clone(),
    );

    if config.autostart {
        manager.start().await;
    }

    let app = create_router(AppState::new(
        Arc::clone(&manager),
        Arc::clone(&tracker),
        fetcher,
    ));
    let listener = TcpListener::bind(&config.control_bind).await?;
    info!("Control surface listening on {}", config.control_bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Shutdown sequence
    info!("Shutting down...");
    manager.stop().await;
    reporter_cancel.cancel();
    let _ = reporter.await;
    publisher.close().await;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Ctrl+C received - initiating graceful shutdown");
}
