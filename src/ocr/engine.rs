//! OCR engine boundary
//!
//! The narrow synchronous contract the service consumes: image path in,
//! ordered detections out, or a typed failure. The shipped adapter drives a
//! `tesseract` subprocess; anything implementing [`OcrEngine`] can be wired
//! in instead.

use std::path::Path;

use async_trait::async_trait;

use super::types::{Detection, EngineError};

/// External OCR engine contract.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Short identifier for logs and stats.
    fn name(&self) -> &'static str;

    /// Whether the engine is usable at all. A not-ready engine still
    /// receives calls; they fail per-file rather than aborting batches.
    fn is_ready(&self) -> bool;

    /// Run recognition on one stored file.
    async fn recognize(&self, path: &Path) -> Result<Vec<Detection>, EngineError>;
}

/// Subprocess adapter around the `tesseract` CLI.
pub struct TesseractEngine {
    ready: bool,
}

impl TesseractEngine {
    /// Probe for the binary once at construction.
    pub fn new() -> Self {
        let ready = std::process::Command::new("tesseract")
            .arg("--version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false);

        if ready {
            tracing::info!("OCR engine initialized");
        } else {
            tracing::warn!(
                "tesseract binary not found; OCR requests will report engine failures"
            );
        }

        Self { ready }
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    async fn recognize(&self, path: &Path) -> Result<Vec<Detection>, EngineError> {
        if !self.ready {
            return Err(EngineError::Unavailable(
                "tesseract binary not found".to_string(),
            ));
        }

        let output = tokio::process::Command::new("tesseract")
            .arg(path)
            .arg("stdout")
            .args(["--oem", "3", "--psm", "3"])
            .output()
            .await
            .map_err(|e| EngineError::Invocation(format!("failed to run tesseract: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::Invocation(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout);
        let detections = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| Detection {
                text: Some(line.to_string()),
                // Plain-text output carries no per-line confidence.
                confidence: 80.0,
                region: [[0.0; 2]; 4],
            })
            .collect();

        Ok(detections)
    }
}
