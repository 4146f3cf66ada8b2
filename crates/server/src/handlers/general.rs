//! # General Route Handlers
//!
//! The root and health-check endpoints. Neither requires a token.

use axum::Json;
use serde_json::{json, Value};

pub async fn root() -> &'static str {
    "callboard server is running."
}

pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
