//! Storage types

use std::path::PathBuf;

use serde::Serialize;
use uuid::Uuid;

/// A file admitted into the upload store.
///
/// The identity is assigned by the store at save time and never derived from
/// client input, so concurrent uploads can never collide on a path.
#[derive(Debug, Clone)]
pub struct SavedFile {
    /// Store-assigned identity.
    pub id: Uuid,
    /// Absolute or store-relative location on disk.
    pub path: PathBuf,
    /// Client-supplied name, untrusted, used only for response labeling.
    pub original_name: String,
}

/// Point-in-time snapshot of the upload directory.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub exists: bool,
    pub path: String,
    pub file_count: usize,
    pub total_size_bytes: u64,
}

/// Storage error types
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to create upload directory {path}: {source}")]
    CreateDir {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to list upload directory {path}: {source}")]
    List {
        path: String,
        source: std::io::Error,
    },
}

/// Failure of a batch save.
///
/// Carries the files that were already saved before the failing entry:
/// the store does not roll them back, the caller decides whether to
/// delete them or keep them for diagnostics.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct BatchSaveError {
    pub saved: Vec<SavedFile>,
    #[source]
    pub source: StorageError,
}
