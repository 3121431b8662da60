use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use crate::app::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
}

async fn root() -> &'static str {
    "Stock digest backend"
}

async fn health_check() -> Json<Value> {
    Json(json!({"status": "running..."}))
}
