//! End-to-end API tests
//!
//! Runs the full router against a scripted engine so OCR outcomes are
//! deterministic: file contents drive the engine's behavior.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use serde_json::Value;
use tempfile::TempDir;

use lector_server::config::Config;
use lector_server::ocr::{Detection, EngineError, OcrEngine, NO_TEXT_DETECTED};
use lector_server::state::AppState;

/// Engine scripted by file content: "BOOM" anywhere fails the file, a PNG
/// signature yields zero detections, anything else yields one detection per
/// text line.
struct ScriptedEngine;

#[async_trait]
impl OcrEngine for ScriptedEngine {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn is_ready(&self) -> bool {
        true
    }

    async fn recognize(&self, path: &Path) -> Result<Vec<Detection>, EngineError> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| EngineError::BadImage(e.to_string()))?;

        if data.windows(4).any(|w| w == b"BOOM") {
            return Err(EngineError::Invocation("corrupt image".to_string()));
        }
        if data.starts_with(b"\x89PNG") {
            return Ok(vec![]);
        }

        let text = String::from_utf8_lossy(&data);
        Ok(text
            .lines()
            .filter(|l| !l.is_empty())
            .map(|line| Detection {
                text: Some(line.to_string()),
                confidence: 90.0,
                region: [[0.0; 2]; 4],
            })
            .collect())
    }
}

fn test_config(temp_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.upload.dir = temp_dir.path().join("uploads");
    config.ocr.force_cpu = true;
    config
}

async fn test_server(config: Config) -> TestServer {
    let state = AppState::with_engine(config, Arc::new(ScriptedEngine))
        .await
        .unwrap();
    TestServer::new(lector_server::app(state)).unwrap()
}

fn upload_dir_file_count(config: &Config) -> usize {
    std::fs::read_dir(&config.upload.dir)
        .map(|entries| entries.count())
        .unwrap_or(0)
}

/// A 100x50 all-white PNG.
fn blank_png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(100, 50, image::Rgb([255, 255, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn png_part(data: Vec<u8>, filename: &str) -> Part {
    Part::bytes(data).file_name(filename).mime_type("image/png")
}

#[tokio::test]
async fn test_root_endpoint() {
    let temp_dir = TempDir::new().unwrap();
    let server = test_server(test_config(&temp_dir)).await;

    let res = server.get("/").await;
    assert_eq!(res.status_code(), StatusCode::OK);

    let body: Value = res.json();
    assert_eq!(body["status"], "running");
    assert!(body["service"].is_string());
    assert!(body["version"].is_string());
    assert!(body["docs"].is_string());
}

#[tokio::test]
async fn test_health_reports_gpu_boolean() {
    let temp_dir = TempDir::new().unwrap();
    let server = test_server(test_config(&temp_dir)).await;

    let res = server.get("/health").await;
    assert_eq!(res.status_code(), StatusCode::OK);

    let body: Value = res.json();
    assert_eq!(body["status"], "healthy");
    assert!(body["gpu_available"].is_boolean());
    assert!(body["uptime_seconds"].is_number());
}

#[tokio::test]
async fn test_request_id_header_on_every_response() {
    let temp_dir = TempDir::new().unwrap();
    let server = test_server(test_config(&temp_dir)).await;

    for path in ["/", "/health", "/stats"] {
        let res = server.get(path).await;
        let header = res.headers().get("x-request-id");
        assert!(header.is_some(), "missing x-request-id on {path}");
        assert_eq!(header.unwrap().to_str().unwrap().len(), 36);
    }
}

#[tokio::test]
async fn test_blank_png_yields_no_text_sentinel() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir);
    let server = test_server(config.clone()).await;

    let form = MultipartForm::new().add_part("files", png_part(blank_png(), "test.png"));
    let res = server.post("/ocr").multipart(form).await;
    assert_eq!(res.status_code(), StatusCode::OK);

    let body: Value = res.json();
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["FileName"], "test.png");
    assert_eq!(results[0]["UUID"].as_str().unwrap().len(), 36);
    assert_eq!(results[0]["Context"], NO_TEXT_DETECTED);
    assert!(body["processing_time"].is_number());
    assert_eq!(body["gpu_used"], false);

    // Request-level cleanup ran.
    assert_eq!(upload_dir_file_count(&config), 0);
}

#[tokio::test]
async fn test_too_many_files_rejected_before_storage() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir);
    let server = test_server(config.clone()).await;

    let mut form = MultipartForm::new();
    for i in 0..12 {
        form = form.add_part("files", png_part(blank_png(), &format!("img{i}.png")));
    }

    let res = server.post("/ocr").multipart(form).await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);

    let body: Value = res.json();
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Too many files"));

    // Nothing was written for the doomed batch.
    assert_eq!(upload_dir_file_count(&config), 0);
}

#[tokio::test]
async fn test_oversized_file_leaves_no_siblings() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(&temp_dir);
    config.upload.max_file_size = 1024;
    let server = test_server(config.clone()).await;

    let form = MultipartForm::new()
        .add_part("files", png_part(b"small".to_vec(), "small.png"))
        .add_part("files", png_part(vec![0u8; 2048], "big.png"));

    let res = server.post("/ocr").multipart(form).await;
    assert_eq!(res.status_code(), StatusCode::PAYLOAD_TOO_LARGE);

    let body: Value = res.json();
    assert!(body["message"].as_str().unwrap().contains("too large"));
    assert!(body["message"].as_str().unwrap().contains("big.png"));

    assert_eq!(upload_dir_file_count(&config), 0);
}

#[tokio::test]
async fn test_missing_filename_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let server = test_server(test_config(&temp_dir)).await;

    let form = MultipartForm::new().add_text("files", "not a file");
    let res = server.post("/ocr").multipart(form).await;

    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = res.json();
    assert_eq!(body["error"], "missing_filename");
}

#[tokio::test]
async fn test_error_body_request_id_matches_header() {
    let temp_dir = TempDir::new().unwrap();
    let server = test_server(test_config(&temp_dir)).await;

    let form = MultipartForm::new().add_text("files", "not a file");
    let res = server.post("/ocr").multipart(form).await;

    let header_id = res
        .headers()
        .get("x-request-id")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let body: Value = res.json();
    assert_eq!(body["request_id"].as_str().unwrap(), header_id);
}

#[tokio::test]
async fn test_per_file_failure_does_not_abort_batch() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir);
    let server = test_server(config.clone()).await;

    let form = MultipartForm::new()
        .add_part("files", png_part(b"alpha text".to_vec(), "a.png"))
        .add_part("files", png_part(b"BOOM".to_vec(), "b.png"))
        .add_part("files", png_part(b"gamma text".to_vec(), "c.png"));

    let res = server.post("/ocr").multipart(form).await;
    assert_eq!(res.status_code(), StatusCode::OK);

    let body: Value = res.json();
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);

    // Submission order preserved.
    assert_eq!(results[0]["FileName"], "a.png");
    assert_eq!(results[1]["FileName"], "b.png");
    assert_eq!(results[2]["FileName"], "c.png");

    assert_eq!(results[0]["Context"], "alpha text");
    assert!(results[1]["Context"]
        .as_str()
        .unwrap()
        .starts_with("OCR processing failed:"));
    assert_eq!(results[2]["Context"], "gamma text");

    assert_eq!(upload_dir_file_count(&config), 0);
}

#[tokio::test]
async fn test_colliding_filenames_get_distinct_identities() {
    let temp_dir = TempDir::new().unwrap();
    let server = test_server(test_config(&temp_dir)).await;

    let form = MultipartForm::new()
        .add_part("files", png_part(b"one".to_vec(), "dup.png"))
        .add_part("files", png_part(b"two".to_vec(), "dup.png"));

    let res = server.post("/ocr").multipart(form).await;
    assert_eq!(res.status_code(), StatusCode::OK);

    let body: Value = res.json();
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["FileName"], "dup.png");
    assert_eq!(results[1]["FileName"], "dup.png");
    assert_ne!(results[0]["UUID"], results[1]["UUID"]);
}

#[tokio::test]
async fn test_empty_batch_is_ok() {
    let temp_dir = TempDir::new().unwrap();
    let server = test_server(test_config(&temp_dir)).await;

    let form = MultipartForm::new().add_text("note", "no files here");
    let res = server.post("/ocr").multipart(form).await;

    assert_eq!(res.status_code(), StatusCode::OK);
    let body: Value = res.json();
    assert_eq!(body["results"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_stats_shape() {
    let temp_dir = TempDir::new().unwrap();
    let server = test_server(test_config(&temp_dir)).await;

    let res = server.get("/stats").await;
    assert_eq!(res.status_code(), StatusCode::OK);

    let body: Value = res.json();
    assert!(body["service"]["uptime_seconds"].is_number());
    assert!(body["gpu"]["gpu_available"].is_boolean());
    assert_eq!(body["ocr_engine"]["engine"], "scripted");
    assert_eq!(body["ocr_engine"]["gpu_enabled"], false);
    assert_eq!(body["file_management"]["exists"], true);
    assert_eq!(body["file_management"]["file_count"], 0);
    // Sweeper is not started in tests.
    assert_eq!(body["file_management"]["cleanup_active"], false);
    assert_eq!(body["configuration"]["max_files"], 10);
    assert_eq!(body["configuration"]["file_retention"], 3600);
    assert_eq!(
        body["configuration"]["ocr_providers"],
        serde_json::json!(["CPUExecutionProvider"])
    );
}
