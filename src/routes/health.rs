//! Health check and monitoring endpoints

use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub gpu_available: bool,
    pub uptime_seconds: f64,
}

/// Liveness plus capability snapshot.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let gpu = state.gpu().info().await;
    let uptime_seconds = state.uptime_seconds();

    tracing::debug!(
        uptime_seconds,
        gpu_available = gpu.gpu_available,
        "Health check requested"
    );

    Json(HealthResponse {
        status: "healthy",
        version: state.config().api.version,
        gpu_available: gpu.gpu_available,
        uptime_seconds,
    })
}

/// Detailed runtime snapshot: service identity, GPU state, engine state,
/// store contents, and the active configuration.
pub async fn stats(State(state): State<AppState>) -> Json<Value> {
    let config = state.config();
    let gpu = state.gpu().info().await;
    let engine = state.gateway().engine_info();
    let store = state.store().stats().await;
    let cleanup_active = state.sweeper().is_running().await;

    Json(json!({
        "service": {
            "name": config.api.title,
            "version": config.api.version,
            "uptime_seconds": state.uptime_seconds(),
        },
        "gpu": gpu,
        "ocr_engine": engine,
        "file_management": {
            "exists": store.exists,
            "path": store.path,
            "file_count": store.file_count,
            "total_size_bytes": store.total_size_bytes,
            "cleanup_active": cleanup_active,
        },
        "configuration": {
            "max_file_size": config.upload.max_file_size,
            "max_files": config.upload.max_files,
            "cleanup_interval": config.upload.cleanup_interval,
            "file_retention": config.upload.file_retention,
            "ocr_providers": config.ocr.providers,
        },
    }))
}
