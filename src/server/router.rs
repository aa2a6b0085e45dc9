use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/start", post(handlers::start))
        .route("/stop", post(handlers::stop))
        .route("/status", get(handlers::status))
        .route("/latest", get(handlers::latest))
        .route("/metrics", get(handlers::metrics))
        .route("/health", get(handlers::health))
        .route("/chart/{coin_id}/{currency}/{days}", get(handlers::chart))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
