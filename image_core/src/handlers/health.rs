//! Liveness check

use axum::{extract::State, response::IntoResponse, Json};
use tracing::debug;

use crate::{models::ApiResponse, AppState};

pub async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    let available = state.storage.is_available().await;
    let status = if available { "healthy" } else { "degraded" };
    debug!(storage_available = available, "GET /health");

    Json(ApiResponse::success(serde_json::json!({
        "status": status,
        "timestamp": chrono::Utc::now().timestamp(),
        "version": state.version,
        "storage": {
            "path": state.storage.root().display().to_string(),
            "available": available,
        }
    })))
}
