use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::app::AppState;

/// GET /health — liveness probe, returns channel and scheduler status.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let channels: Vec<Value> = state
        .channels
        .statuses()
        .into_iter()
        .map(|(name, status)| json!({"name": name, "status": format!("{status:?}")}))
        .collect();

    let jobs = state.scheduler.list_jobs().map(|j| j.len()).unwrap_or(0);

    Json(json!({
        "status": "ok",
        "channels": channels,
        "scheduled_jobs": jobs,
    }))
}
