//! Upload storage
//!
//! Temporary on-disk storage for uploaded files plus the background
//! retention sweeper that deletes anything orphaned by a crashed or
//! disconnected request.

pub mod store;
pub mod sweeper;
pub mod types;

pub use store::UploadStore;
pub use sweeper::RetentionSweeper;
pub use types::{BatchSaveError, SavedFile, StorageError, StoreStats};
