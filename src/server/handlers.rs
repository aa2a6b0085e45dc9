/// Control surface handlers
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::warn;

use super::state::AppState;
use crate::process::StartOutcome;
use crate::types::Currency;

pub async fn start(State(state): State<AppState>) -> Json<Value> {
    match state.manager.start().await {
        StartOutcome::Started => Json(json!({ "status": "started" })),
        StartOutcome::AlreadyRunning => {
            let data = if state.manager.republish_latest().await {
                "Data sent to event dispatcher"
            } else {
                "No data available"
            };
            Json(json!({ "status": "already running", "data": data }))
        }
    }
}

pub async fn stop(State(state): State<AppState>) -> Json<Value> {
    state.manager.stop().await;
    Json(json!({ "status": "stopped" }))
}

pub async fn status(State(state): State<AppState>) -> Json<Value> {
    let run_state = state.manager.status().await;
    Json(json!({ "status": run_state.as_str() }))
}

pub async fn latest(State(state): State<AppState>) -> Json<Value> {
    match state.manager.latest().await {
        Some(snapshot) => Json(json!(snapshot.as_ref())),
        None => Json(json!({ "cycle": null, "assets": [] })),
    }
}

pub async fn metrics(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "totalCalls": state.tracker.total_calls() }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// `GET /chart/{coin_id}/{currency}/{days}`
pub async fn chart(
    State(state): State<AppState>,
    Path((coin_id, currency, days)): Path<(String, String, String)>,
) -> Response {
    if coin_id.is_empty() || !coin_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return bad_request("Missing or malformed coinId");
    }
    let Some(currency) = Currency::from_code(&currency) else {
        return bad_request("Missing or malformed currency");
    };
    let days = match days.parse::<u32>() {
        Ok(days) if days > 0 => days,
        _ => return bad_request("Missing or malformed days"),
    };

    match state.charts.chart(coin_id.clone(), currency, days).await {
        Ok(chart) => Json(chart).into_response(),
        Err(e) => {
            warn!(coin_id = %coin_id, %currency, days, "Chart fetch failed: {} ({})", e, e.error_code());
            (StatusCode::NOT_FOUND, Json(json!({ "error": "Chart data not found" }))).into_response()
        }
    }
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}
