//! HTTP request handlers for the REST API.

pub mod ai;
pub mod auth;
pub mod message;
pub mod persona;
pub mod session;

use axum::Json;
use serde_json::{Value, json};

/// GET /health - Liveness probe.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
