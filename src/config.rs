//! Configuration management for the Lector OCR service
//!
//! Everything is environment-overridable with sensible defaults, loaded once
//! at startup (`.env` files honored via dotenvy in `main`).

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LogConfig,
    pub upload: UploadConfig,
    pub ocr: OcrConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Root directory for temporary upload storage, created if absent.
    pub dir: PathBuf,
    /// Maximum size of a single uploaded file in bytes.
    pub max_file_size: u64,
    /// Maximum number of files per request.
    pub max_files: usize,
    /// Seconds between retention sweeper passes.
    pub cleanup_interval: u64,
    /// Maximum age in seconds a stored file may reach before it is swept.
    pub file_retention: u64,
    /// Extensions (with leading dot, lowercase) preserved on stored files.
    /// Anything else is stored as `.bin`.
    pub allowed_extensions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Explicit GPU preference: `Some(true)` requests acceleration,
    /// `Some(false)` requests CPU, `None` means auto-detect.
    pub use_gpu: Option<bool>,
    /// Hard override that wins over everything else.
    pub force_cpu: bool,
    /// Configured execution-provider preference list, reported in /stats.
    pub providers: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub title: String,
    pub description: String,
    pub version: &'static str,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            logging: LogConfig {
                level: "info".to_string(),
                format: LogFormat::Json,
            },
            upload: UploadConfig {
                dir: PathBuf::from("temp"),
                max_file_size: 10 * 1024 * 1024,
                max_files: 10,
                cleanup_interval: 3600,
                file_retention: 3600,
                allowed_extensions: [".jpg", ".jpeg", ".png", ".bmp", ".tiff", ".tif", ".webp"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            },
            ocr: OcrConfig {
                use_gpu: None,
                force_cpu: false,
                providers: vec!["CPUExecutionProvider".to_string()],
            },
            api: ApiConfig {
                title: "Lector OCR Service".to_string(),
                description: "OCR processing service with GPU support".to_string(),
                version: env!("CARGO_PKG_VERSION"),
            },
        }
    }
}

impl Config {
    /// Build configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: env_parse("SERVER_PORT", defaults.server.port),
            },
            logging: LogConfig {
                level: env::var("LOG_LEVEL").unwrap_or(defaults.logging.level),
                format: match env::var("LOG_FORMAT").as_deref() {
                    Ok("text") => LogFormat::Text,
                    _ => LogFormat::Json,
                },
            },
            upload: UploadConfig {
                dir: env::var("UPLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.upload.dir),
                max_file_size: env_parse("MAX_FILE_SIZE", defaults.upload.max_file_size),
                max_files: env_parse("MAX_FILES", defaults.upload.max_files),
                cleanup_interval: env_parse("CLEANUP_INTERVAL", defaults.upload.cleanup_interval),
                file_retention: env_parse("FILE_RETENTION", defaults.upload.file_retention),
                allowed_extensions: env_list("ALLOWED_EXTENSIONS")
                    .map(|list| list.iter().map(|e| normalize_extension(e)).collect())
                    .unwrap_or(defaults.upload.allowed_extensions),
            },
            ocr: OcrConfig {
                use_gpu: env_flag("OCR_USE_GPU"),
                force_cpu: env_flag("FORCE_CPU").unwrap_or(false),
                providers: env_list("OCR_PROVIDERS").unwrap_or(defaults.ocr.providers),
            },
            api: defaults.api,
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parse a comma-separated environment variable into a list.
fn env_list(key: &str) -> Option<Vec<String>> {
    let raw = env::var(key).ok()?;
    let list: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if list.is_empty() {
        None
    } else {
        Some(list)
    }
}

/// Parse a truthy/falsy environment variable. Unset or unrecognized → `None`.
fn env_flag(key: &str) -> Option<bool> {
    match env::var(key).ok()?.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Lowercase and ensure a leading dot so `PNG` and `.png` configure the same
/// extension.
fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_ascii_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}
