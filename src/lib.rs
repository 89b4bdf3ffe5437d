//! Lector Server
//!
//! An OCR HTTP service: multipart image uploads in, extracted text plus
//! metadata out. Uploads are admitted into a managed temporary store,
//! processed through an engine gateway, and cleaned up both per-request and
//! by a background retention sweeper.

pub mod config;
pub mod error;
pub mod gpu;
pub mod middleware;
pub mod ocr;
pub mod routes;
pub mod state;
pub mod storage;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the service router around an [`AppState`].
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Generous slack over the per-file limit; exact sizes are enforced in
    // the handler so oversized files get a structured 413.
    let upload = &state.config().upload;
    let body_limit =
        (upload.max_file_size as usize) * upload.max_files.max(1) + 1024 * 1024;

    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health::health_check))
        .route("/stats", get(routes::health::stats))
        .route("/ocr", post(routes::ocr::process_ocr))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum::middleware::from_fn(middleware::request_context))
        .with_state(state)
}
