//! Retention Sweeper
//!
//! A background loop that periodically sweeps the upload store for files
//! older than the retention window. Runs independently of any request so it
//! also catches files orphaned by client disconnects or crashes between save
//! and explicit cleanup.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use super::store::UploadStore;

/// Periodic cleanup task over an [`UploadStore`].
#[derive(Clone)]
pub struct RetentionSweeper {
    inner: Arc<SweeperInner>,
}

struct SweeperInner {
    store: UploadStore,
    interval: Duration,
    retention: Duration,
    task: Mutex<Option<SweepTask>>,
}

struct SweepTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl RetentionSweeper {
    pub fn new(store: UploadStore, interval: Duration, retention: Duration) -> Self {
        Self {
            inner: Arc::new(SweeperInner {
                store,
                interval,
                retention,
                task: Mutex::new(None),
            }),
        }
    }

    /// Start the sweep loop. Idempotent: calling this while the loop is
    /// already running is a no-op.
    pub async fn start(&self) {
        let mut task = self.inner.task.lock().await;
        if let Some(existing) = task.as_ref() {
            if !existing.handle.is_finished() {
                tracing::debug!("Retention sweeper already running");
                return;
            }
        }

        let (shutdown, mut rx) = watch::channel(false);
        let store = self.inner.store.clone();
        let interval = self.inner.interval;
        let retention = self.inner.retention;

        let handle = tokio::spawn(async move {
            loop {
                // The next sleep begins only after the previous sweep
                // returns, so passes never overlap.
                tokio::select! {
                    _ = rx.changed() => break,
                    _ = tokio::time::sleep(interval) => {
                        if let Err(e) = store.sweep_expired(retention).await {
                            tracing::error!(error = %e, "Sweep pass failed");
                        }
                    }
                }
            }
            tracing::info!("Retention sweeper stopped");
        });

        *task = Some(SweepTask { shutdown, handle });
        tracing::info!(
            cleanup_interval = interval.as_secs(),
            retention_time = retention.as_secs(),
            "Started retention sweeper"
        );
    }

    /// Request cancellation and wait for the loop to observe it and exit.
    pub async fn stop(&self) {
        let task = self.inner.task.lock().await.take();
        if let Some(task) = task {
            let _ = task.shutdown.send(true);
            if let Err(e) = task.handle.await {
                tracing::error!(error = %e, "Retention sweeper task failed to join");
            }
        }
    }

    pub async fn is_running(&self) -> bool {
        self.inner
            .task
            .lock()
            .await
            .as_ref()
            .map(|t| !t.handle.is_finished())
            .unwrap_or(false)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn store_in(temp_dir: &TempDir) -> UploadStore {
        UploadStore::new(temp_dir.path().join("uploads"), vec![".png".to_string()])
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir).await;
        let sweeper = RetentionSweeper::new(store, Duration::from_secs(60), Duration::ZERO);

        assert!(!sweeper.is_running().await);
        sweeper.start().await;
        sweeper.start().await;
        assert!(sweeper.is_running().await);

        sweeper.stop().await;
        assert!(!sweeper.is_running().await);
    }

    #[tokio::test]
    async fn test_stop_without_start_is_harmless() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir).await;
        let sweeper = RetentionSweeper::new(store, Duration::from_secs(60), Duration::ZERO);

        sweeper.stop().await;
        assert!(!sweeper.is_running().await);
    }

    #[tokio::test]
    async fn test_loop_sweeps_expired_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir).await;
        store.save(b"stale", "stale.png").await.unwrap();

        let sweeper = RetentionSweeper::new(
            store.clone(),
            Duration::from_millis(10),
            Duration::ZERO,
        );
        sweeper.start().await;

        // Give the loop a few ticks to run a pass.
        tokio::time::sleep(Duration::from_millis(100)).await;
        sweeper.stop().await;

        assert_eq!(store.stats().await.file_count, 0);
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir).await;
        let sweeper = RetentionSweeper::new(store, Duration::from_secs(60), Duration::ZERO);

        sweeper.start().await;
        sweeper.stop().await;
        sweeper.start().await;
        assert!(sweeper.is_running().await);
        sweeper.stop().await;
    }
}
