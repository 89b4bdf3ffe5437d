//! OCR types

use serde::Serialize;

/// Sentinel returned when the engine ran successfully but recognized no
/// text. Distinct from a failure message.
pub const NO_TEXT_DETECTED: &str = "No text detected";

/// One detected text region, in detection order.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Recognized text, if the region carried any.
    pub text: Option<String>,
    /// Confidence score (0-100).
    pub confidence: f32,
    /// Bounding region corners (clockwise from top-left). Engines that do
    /// not report geometry leave this zeroed.
    pub region: [[f32; 2]; 4],
}

/// Engine error types
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("OCR engine not available: {0}")]
    Unavailable(String),

    #[error("Engine invocation failed: {0}")]
    Invocation(String),

    #[error("Unreadable image: {0}")]
    BadImage(String),
}

/// OCR outcome for a single file, serialized with the client-visible field
/// names.
#[derive(Debug, Clone, Serialize)]
pub struct OcrResult {
    /// Original filename of the processed image.
    #[serde(rename = "FileName")]
    pub file_name: String,

    /// Store-assigned identity for this file.
    #[serde(rename = "UUID")]
    pub uuid: String,

    /// Extracted text, the no-text sentinel, or a failure description.
    #[serde(rename = "Context")]
    pub context: String,
}

/// Engine configuration snapshot for health and stats endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct EngineInfo {
    pub engine_initialized: bool,
    pub engine: &'static str,
    pub backend: String,
    pub gpu_enabled: bool,
    pub providers: Vec<String>,
}
