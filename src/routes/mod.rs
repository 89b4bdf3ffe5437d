//! HTTP routes

pub mod health;
pub mod ocr;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// Root endpoint with basic service information.
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    let api = &state.config().api;
    Json(json!({
        "service": api.title,
        "version": api.version,
        "status": "running",
        "docs": "/docs",
        "health": "/health",
    }))
}
