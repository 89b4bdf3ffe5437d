//! OCR processing
//!
//! The engine itself is an opaque collaborator behind the [`OcrEngine`]
//! trait; the gateway adapts it to the service's per-file and per-batch
//! contract and absorbs engine failures into per-result failure text.

pub mod engine;
pub mod gateway;
pub mod types;

pub use engine::{OcrEngine, TesseractEngine};
pub use gateway::OcrGateway;
pub use types::{Detection, EngineError, EngineInfo, OcrResult, NO_TEXT_DETECTED};
