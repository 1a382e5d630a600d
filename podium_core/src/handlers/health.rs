use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::AppState;

pub async fn handle_health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "app": state.app_name,
        "version": state.version,
        "timestamp": chrono::Utc::now().timestamp(),
    }))
}
