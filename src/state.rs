//! Application state management

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::gpu::GpuDetector;
use crate::ocr::{OcrEngine, OcrGateway, TesseractEngine};
use crate::storage::{RetentionSweeper, StorageError, UploadStore};

/// Error type for state initialization
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to initialize upload store: {0}")]
    Store(#[from] StorageError),
}

/// Shared application state: explicitly constructed service objects passed
/// to handlers instead of module-level globals.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    store: UploadStore,
    sweeper: RetentionSweeper,
    gpu: GpuDetector,
    gateway: OcrGateway,
    started_at: Instant,
}

impl AppState {
    /// Build the state with the default engine adapter.
    pub async fn new(config: Config) -> Result<Self, StateError> {
        let engine: Arc<dyn OcrEngine> = Arc::new(TesseractEngine::new());
        Self::with_engine(config, engine).await
    }

    /// Build the state around a caller-supplied engine. Used by tests and by
    /// deployments that wire in a different backend.
    pub async fn with_engine(
        config: Config,
        engine: Arc<dyn OcrEngine>,
    ) -> Result<Self, StateError> {
        let store = UploadStore::new(
            config.upload.dir.clone(),
            config.upload.allowed_extensions.clone(),
        )
        .await?;

        let sweeper = RetentionSweeper::new(
            store.clone(),
            Duration::from_secs(config.upload.cleanup_interval),
            Duration::from_secs(config.upload.file_retention),
        );

        let gpu = GpuDetector::new();
        let backend = gpu.configure(config.ocr.force_cpu, config.ocr.use_gpu).await;
        let gateway = OcrGateway::new(engine, backend);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                sweeper,
                gpu,
                gateway,
                started_at: Instant::now(),
            }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn store(&self) -> &UploadStore {
        &self.inner.store
    }

    pub fn sweeper(&self) -> &RetentionSweeper {
        &self.inner.sweeper
    }

    pub fn gpu(&self) -> &GpuDetector {
        &self.inner.gpu
    }

    pub fn gateway(&self) -> &OcrGateway {
        &self.inner.gateway
    }

    pub fn uptime_seconds(&self) -> f64 {
        self.inner.started_at.elapsed().as_secs_f64()
    }

    /// Stop background work. Called after the server has drained in-flight
    /// requests.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down application state");
        self.inner.sweeper.stop().await;
    }
}
