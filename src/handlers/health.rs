use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;

use crate::state::AppState;

// GET /
pub async fn index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "slotbook",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "uptime_secs": state.started_at.elapsed().as_secs(),
    }))
}
