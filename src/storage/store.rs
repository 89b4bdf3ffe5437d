//! Upload Store
//!
//! Persists each incoming file under a freshly generated UUID identity inside
//! a single root directory. All mutation stays within that root.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use uuid::Uuid;

use super::types::{BatchSaveError, SavedFile, StorageError, StoreStats};

/// Extension used when the declared name has none, or one we do not allow.
const FALLBACK_EXTENSION: &str = ".bin";

/// Filesystem-backed store for uploaded files.
#[derive(Clone)]
pub struct UploadStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    root: PathBuf,
    allowed_extensions: Vec<String>,
}

impl UploadStore {
    /// Create a store rooted at `root`, creating the directory if absent.
    pub async fn new(
        root: impl Into<PathBuf>,
        allowed_extensions: Vec<String>,
    ) -> Result<Self, StorageError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|source| StorageError::CreateDir {
                path: root.display().to_string(),
                source,
            })?;

        Ok(Self {
            inner: Arc::new(StoreInner {
                root,
                allowed_extensions,
            }),
        })
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Save one file under a fresh identity.
    ///
    /// On a failed write any partial file at the target location is removed
    /// before the error is returned.
    pub async fn save(&self, data: &[u8], declared_name: &str) -> Result<SavedFile, StorageError> {
        let id = Uuid::new_v4();
        let path = self
            .inner
            .root
            .join(format!("{}{}", id, self.extension_for(declared_name)));

        if let Err(source) = tokio::fs::write(&path, data).await {
            let _ = tokio::fs::remove_file(&path).await;
            tracing::error!(
                file_uuid = %id,
                original_name = %declared_name,
                error = %source,
                "Failed to save upload file"
            );
            return Err(StorageError::Write {
                path: path.display().to_string(),
                source,
            });
        }

        tracing::debug!(
            file_uuid = %id,
            original_name = %declared_name,
            file_size = data.len(),
            file_path = %path.display(),
            "Saved upload file"
        );

        Ok(SavedFile {
            id,
            path,
            original_name: declared_name.to_string(),
        })
    }

    /// Save a batch of `(declared_name, bytes)` pairs in input order.
    ///
    /// The first failure aborts the batch; files saved before it stay on disk
    /// and are reported through [`BatchSaveError`] so the caller can decide
    /// whether to clean them up.
    pub async fn save_batch(
        &self,
        files: &[(String, Bytes)],
    ) -> Result<Vec<SavedFile>, BatchSaveError> {
        let mut saved = Vec::with_capacity(files.len());

        for (declared_name, data) in files {
            match self.save(data, declared_name).await {
                Ok(file) => saved.push(file),
                Err(source) => {
                    tracing::error!(
                        filename = %declared_name,
                        saved_so_far = saved.len(),
                        error = %source,
                        "Failed to save file in batch"
                    );
                    return Err(BatchSaveError { saved, source });
                }
            }
        }

        tracing::info!(file_count = saved.len(), "Saved upload batch");
        Ok(saved)
    }

    /// Remove a file if present. Absence is not an error; deletion is
    /// idempotent so the sweeper and request cleanup may race harmlessly.
    pub async fn delete(&self, path: &Path) -> bool {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                tracing::debug!(file_path = %path.display(), "Cleaned up file");
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                tracing::warn!(
                    file_path = %path.display(),
                    error = %e,
                    "Failed to cleanup file"
                );
                false
            }
        }
    }

    /// Delete every entry whose modified-age exceeds `retention` and return
    /// the number deleted. Errors on individual entries are logged and
    /// skipped; one bad entry never aborts the sweep.
    pub async fn sweep_expired(&self, retention: Duration) -> Result<usize, StorageError> {
        let mut entries =
            tokio::fs::read_dir(&self.inner.root)
                .await
                .map_err(|source| StorageError::List {
                    path: self.inner.root.display().to_string(),
                    source,
                })?;

        let mut removed = 0;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    // Deletions already applied stand; the caller learns the
                    // sweep did not cover the whole directory.
                    tracing::warn!(
                        error = %e,
                        cleanup_count = removed,
                        "Directory stream failed mid-sweep"
                    );
                    return Err(StorageError::List {
                        path: self.inner.root.display().to_string(),
                        source: e,
                    });
                }
            };

            let metadata = match entry.metadata().await {
                Ok(m) if m.is_file() => m,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(
                        file_path = %entry.path().display(),
                        error = %e,
                        "Skipping unreadable entry during sweep"
                    );
                    continue;
                }
            };

            let age = metadata.modified().ok().and_then(|m| m.elapsed().ok());
            if matches!(age, Some(age) if age > retention) && self.delete(&entry.path()).await {
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!(cleanup_count = removed, "Cleaned up old files");
        }
        Ok(removed)
    }

    /// Point-in-time snapshot of the store. Costs a single directory listing
    /// and never blocks on concurrent writers.
    pub async fn stats(&self) -> StoreStats {
        let path = self.inner.root.display().to_string();

        let mut entries = match tokio::fs::read_dir(&self.inner.root).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read upload directory for stats");
                return StoreStats {
                    exists: false,
                    path,
                    file_count: 0,
                    total_size_bytes: 0,
                };
            }
        };

        let mut file_count = 0;
        let mut total_size_bytes = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            if let Ok(metadata) = entry.metadata().await {
                if metadata.is_file() {
                    file_count += 1;
                    total_size_bytes += metadata.len();
                }
            }
        }

        StoreStats {
            exists: true,
            path,
            file_count,
            total_size_bytes,
        }
    }

    /// Normalized extension for a declared filename: lowercased, and only
    /// kept when it is on the allow list. Everything else becomes `.bin`.
    fn extension_for(&self, declared_name: &str) -> String {
        let ext = Path::new(declared_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_ascii_lowercase()));

        match ext {
            Some(ext) if self.inner.allowed_extensions.contains(&ext) => ext,
            _ => FALLBACK_EXTENSION.to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
