//! OCR Gateway
//!
//! Adapts the engine to the service's per-file and per-batch contract.
//! A single bad file never aborts a batch: engine failures become
//! failure-description results.

use std::sync::Arc;
use std::time::Instant;

use crate::gpu::BackendConfig;
use crate::storage::SavedFile;

use super::engine::OcrEngine;
use super::types::{EngineInfo, OcrResult, NO_TEXT_DETECTED};

#[derive(Clone)]
pub struct OcrGateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    engine: Arc<dyn OcrEngine>,
    backend: BackendConfig,
}

impl OcrGateway {
    pub fn new(engine: Arc<dyn OcrEngine>, backend: BackendConfig) -> Self {
        tracing::info!(
            engine = engine.name(),
            gpu_enabled = backend.use_gpu,
            providers = ?backend.providers,
            "OCR gateway initialized"
        );
        Self {
            inner: Arc::new(GatewayInner { engine, backend }),
        }
    }

    /// True iff the active backend uses a non-CPU execution path.
    pub fn is_accelerated(&self) -> bool {
        self.inner.backend.use_gpu
    }

    /// Engine configuration snapshot for health and stats endpoints.
    pub fn engine_info(&self) -> EngineInfo {
        EngineInfo {
            engine_initialized: self.inner.engine.is_ready(),
            engine: self.inner.engine.name(),
            backend: self.inner.backend.description.clone(),
            gpu_enabled: self.inner.backend.use_gpu,
            providers: self.inner.backend.providers.clone(),
        }
    }

    /// Process a single stored file. Never errors: engine failures are
    /// folded into the result text, and zero recognized lines yields the
    /// no-text sentinel.
    pub async fn process_one(&self, file: &SavedFile) -> OcrResult {
        let start = Instant::now();

        let context = match self.inner.engine.recognize(&file.path).await {
            Ok(detections) => {
                let text = detections
                    .iter()
                    .filter_map(|d| d.text.as_deref())
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n");
                if text.is_empty() {
                    NO_TEXT_DETECTED.to_string()
                } else {
                    text
                }
            }
            Err(e) => {
                tracing::error!(
                    file_uuid = %file.id,
                    filename = %file.original_name,
                    error = %e,
                    "OCR processing failed"
                );
                format!("OCR processing failed: {e}")
            }
        };

        tracing::info!(
            file_uuid = %file.id,
            filename = %file.original_name,
            processing_time_ms = start.elapsed().as_millis() as u64,
            text_length = context.len(),
            gpu_used = self.is_accelerated(),
            "OCR processing completed"
        );

        OcrResult {
            file_name: file.original_name.clone(),
            uuid: file.id.to_string(),
            context,
        }
    }

    /// Process a batch sequentially in input order. Order preservation is
    /// required: results are matched to client-visible filenames by
    /// position.
    pub async fn process_batch(&self, files: &[SavedFile]) -> Vec<OcrResult> {
        let start = Instant::now();
        tracing::info!(
            file_count = files.len(),
            gpu_enabled = self.is_accelerated(),
            "Starting batch OCR processing"
        );

        let mut results = Vec::with_capacity(files.len());
        for file in files {
            results.push(self.process_one(file).await);
        }

        tracing::info!(
            file_count = files.len(),
            total_time_ms = start.elapsed().as_millis() as u64,
            "Batch OCR processing completed"
        );

        results
    }
}

// ============================================================================
// Tests
// ============================================================================
