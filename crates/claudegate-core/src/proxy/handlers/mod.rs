// Handlers module - API endpoint handlers

pub mod chat;
pub mod errors;
pub mod models;

use axum::{response::IntoResponse, Json};
use serde_json::json;

pub async fn handle_health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
