//! GPU detection and backend configuration
//!
//! Probes the host once for CUDA hardware (via `nvidia-smi`), caches the
//! result, and derives the OCR execution backend from that probe plus
//! explicit overrides. Probe failures always degrade to CPU-only operation.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::OnceCell;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Cached outcome of the hardware probe.
#[derive(Debug, Clone)]
struct GpuProbe {
    available: bool,
    description: String,
}

impl GpuProbe {
    fn unavailable() -> Self {
        Self {
            available: false,
            description: "Not available".to_string(),
        }
    }
}

/// Capability snapshot for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct GpuInfo {
    pub gpu_available: bool,
    pub gpu_info: String,
    pub detection_completed: bool,
}

/// The chosen execution path for the OCR engine.
#[derive(Debug, Clone, Serialize)]
pub struct BackendConfig {
    pub use_gpu: bool,
    pub providers: Vec<String>,
    pub description: String,
}

impl BackendConfig {
    fn cpu(description: impl Into<String>) -> Self {
        Self {
            use_gpu: false,
            providers: vec!["CPUExecutionProvider".to_string()],
            description: description.into(),
        }
    }

    fn cuda(description: impl Into<String>) -> Self {
        Self {
            use_gpu: true,
            providers: vec![
                "CUDAExecutionProvider".to_string(),
                "CPUExecutionProvider".to_string(),
            ],
            description: description.into(),
        }
    }
}

/// Process-wide GPU detector with compute-once-then-freeze probe state.
///
/// Concurrent first calls serialize through the cell, so at most one probe
/// executes; the probe itself has no side effects beyond an optional
/// environment default.
pub struct GpuDetector {
    probe: OnceCell<GpuProbe>,
}

impl GpuDetector {
    pub fn new() -> Self {
        Self {
            probe: OnceCell::new(),
        }
    }

    /// Pre-seeded detector for exercising the decision table without
    /// hardware.
    #[cfg(test)]
    pub fn with_probe(available: bool, description: &str) -> Self {
        Self {
            probe: OnceCell::new_with(Some(GpuProbe {
                available,
                description: description.to_string(),
            })),
        }
    }

    /// Whether hardware acceleration is available. Probes on first call,
    /// cached afterwards.
    pub async fn detect(&self) -> bool {
        self.probe().await.available
    }

    /// Decide the execution backend from the override flag, the explicit
    /// preference, and the detection result.
    pub async fn configure(&self, force_cpu: bool, prefer_gpu: Option<bool>) -> BackendConfig {
        if force_cpu {
            tracing::info!("GPU usage disabled by FORCE_CPU override");
            return BackendConfig::cpu("CPU (forced by override)");
        }

        match prefer_gpu {
            Some(true) => {
                if self.detect().await {
                    tracing::info!("Forcing GPU usage as per configuration");
                    self.cuda_backend().await
                } else {
                    tracing::warn!("GPU usage requested but no GPU available, falling back to CPU");
                    BackendConfig::cpu("CPU (GPU requested but unavailable)")
                }
            }
            Some(false) => {
                tracing::info!("Forcing CPU usage as per configuration");
                BackendConfig::cpu("CPU (explicit preference)")
            }
            None => {
                if self.detect().await {
                    self.cuda_backend().await
                } else {
                    BackendConfig::cpu("CPU (no GPU detected)")
                }
            }
        }
    }

    /// Read-only snapshot for health reporting. Triggers detection if it has
    /// never run.
    pub async fn info(&self) -> GpuInfo {
        let probe = self.probe().await;
        GpuInfo {
            gpu_available: probe.available,
            gpu_info: probe.description.clone(),
            detection_completed: true,
        }
    }

    async fn cuda_backend(&self) -> BackendConfig {
        // Default to the first GPU unless the operator already pinned one.
        if std::env::var_os("CUDA_VISIBLE_DEVICES").is_none() {
            std::env::set_var("CUDA_VISIBLE_DEVICES", "0");
        }
        let description = self.probe().await.description.clone();
        tracing::info!(gpu_info = %description, "Configured for CUDA GPU acceleration");
        BackendConfig::cuda(description)
    }

    async fn probe(&self) -> &GpuProbe {
        self.probe
            .get_or_init(|| async {
                let probe = run_probe().await;
                if probe.available {
                    tracing::info!(gpu_info = %probe.description, "GPU acceleration available");
                } else {
                    tracing::info!("No GPU acceleration available, using CPU");
                }
                probe
            })
            .await
    }
}

impl Default for GpuDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Query `nvidia-smi` for GPU names. Any failure mode (missing binary,
/// non-zero exit, timeout) means "not available".
async fn run_probe() -> GpuProbe {
    let command = tokio::process::Command::new("nvidia-smi")
        .args(["--query-gpu=name", "--format=csv,noheader"])
        .output();

    match tokio::time::timeout(PROBE_TIMEOUT, command).await {
        Ok(Ok(output)) if output.status.success() => {
            let names = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if names.is_empty() {
                GpuProbe::unavailable()
            } else {
                GpuProbe {
                    available: true,
                    description: format!("CUDA: {}", names.replace('\n', ", ")),
                }
            }
        }
        Ok(_) => {
            tracing::debug!("CUDA not available or nvidia-smi not found");
            GpuProbe::unavailable()
        }
        Err(_) => {
            tracing::debug!("nvidia-smi probe timed out");
            GpuProbe::unavailable()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
