//! OCR processing endpoint
//!
//! Drives the request lifecycle: collect multipart parts, validate the whole
//! batch, store, process, clean up, respond. Validation happens before
//! anything touches disk, and every stored file of the request is deleted
//! after processing regardless of outcome.

use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{Multipart, State},
    Extension, Json,
};
use serde::Serialize;

use crate::error::{ApiError, AppError};
use crate::middleware::RequestId;
use crate::ocr::OcrResult;
use crate::state::AppState;

/// Response model for the OCR endpoint.
#[derive(Debug, Serialize)]
pub struct OcrResponse {
    pub results: Vec<OcrResult>,
    pub processing_time: f64,
    pub gpu_used: bool,
}

/// POST /ocr
///
/// Process one or more images for OCR text extraction. Each file is
/// assigned a UUID for tracking; results come back in submission order.
pub async fn process_ocr(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    multipart: Multipart,
) -> Result<Json<OcrResponse>, ApiError> {
    run_batch(&state, multipart)
        .await
        .map_err(|e| e.with_request_id(request_id.0))
}

async fn run_batch(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<Json<OcrResponse>, AppError> {
    // Collect every part up front so the whole batch is validated before a
    // single byte is stored.
    let mut uploads: Vec<(String, Bytes)> = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Multipart(e.to_string()))?
    {
        if field.name() != Some("files") {
            continue;
        }

        let filename = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Err(AppError::MissingFilename),
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Multipart(e.to_string()))?;
        uploads.push((filename, data));
    }

    process_uploads(state, uploads).await
}

async fn process_uploads(
    state: &AppState,
    uploads: Vec<(String, Bytes)>,
) -> Result<Json<OcrResponse>, AppError> {
    let start = Instant::now();
    let limits = &state.config().upload;

    if uploads.len() > limits.max_files {
        tracing::warn!(
            file_count = uploads.len(),
            max_allowed = limits.max_files,
            "Too many files uploaded"
        );
        return Err(AppError::TooManyFiles {
            count: uploads.len(),
            max: limits.max_files,
        });
    }

    // Size is judged from the collected bytes, not a client-declared header.
    for (name, data) in &uploads {
        if data.len() as u64 > limits.max_file_size {
            tracing::warn!(
                filename = %name,
                size = data.len(),
                max_size = limits.max_file_size,
                "File too large"
            );
            return Err(AppError::FileTooLarge {
                name: name.clone(),
                size: data.len(),
                max: limits.max_file_size,
            });
        }
    }

    let saved = match state.store().save_batch(&uploads).await {
        Ok(saved) => saved,
        Err(err) => {
            // The store does not roll back; the request does.
            for file in &err.saved {
                state.store().delete(&file.path).await;
            }
            return Err(AppError::Storage(err.source));
        }
    };

    tracing::info!(
        file_count = saved.len(),
        "Processing OCR batch"
    );

    let results = state.gateway().process_batch(&saved).await;

    // Unconditional request-level cleanup; the sweeper is only the backstop.
    for file in &saved {
        state.store().delete(&file.path).await;
    }

    let processing_time = start.elapsed().as_secs_f64();
    let gpu_used = state.gateway().is_accelerated();

    tracing::info!(
        file_count = results.len(),
        processing_time,
        gpu_used,
        "OCR batch completed"
    );

    Ok(Json(OcrResponse {
        results,
        processing_time,
        gpu_used,
    }))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ocr::{Detection, EngineError, OcrEngine};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct NoopEngine;

    #[async_trait]
    impl OcrEngine for NoopEngine {
        fn name(&self) -> &'static str {
            "noop"
        }

        fn is_ready(&self) -> bool {
            true
        }

        async fn recognize(&self, _path: &Path) -> Result<Vec<Detection>, EngineError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_mid_batch_save_failure_cleans_up_siblings() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.upload.dir = temp_dir.path().join("uploads");
        config.ocr.force_cpu = true;
        // An allowed extension carrying a NUL byte produces an unwritable
        // target path, so the save for that file fails after earlier files
        // in the batch have already been stored.
        config
            .upload
            .allowed_extensions
            .push(".p\u{0}g".to_string());

        let state = AppState::with_engine(config.clone(), Arc::new(NoopEngine))
            .await
            .unwrap();

        let uploads = vec![
            ("ok.png".to_string(), Bytes::from_static(b"fine")),
            ("bad.p\u{0}g".to_string(), Bytes::from_static(b"doomed")),
        ];

        let err = process_uploads(&state, uploads).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert_eq!(err.status_code().as_u16(), 500);

        // The file stored before the failure was deleted before the error
        // surfaced.
        let entries = std::fs::read_dir(&config.upload.dir).unwrap().count();
        assert_eq!(entries, 0);
    }

    #[tokio::test]
    async fn test_batch_without_failures_responds_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.upload.dir = temp_dir.path().join("uploads");
        config.ocr.force_cpu = true;

        let state = AppState::with_engine(config, Arc::new(NoopEngine))
            .await
            .unwrap();

        let uploads = vec![
            ("a.png".to_string(), Bytes::from_static(b"1")),
            ("b.png".to_string(), Bytes::from_static(b"2")),
        ];

        let Json(response) = process_uploads(&state, uploads).await.unwrap();
        assert_eq!(response.results.len(), 2);
        assert_eq!(response.results[0].file_name, "a.png");
        assert_eq!(response.results[1].file_name, "b.png");
    }
}
