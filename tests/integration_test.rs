use base64::{engine::general_purpose::STANDARD, Engine as _};
use captcha_solver::config::Config;
use captcha_solver::engine::{OcrConfig, OcrEngine};
use captcha_solver::engines::EngineInfo;
use captcha_solver::error::OcrError;
use captcha_solver::server::{router, AppState};
use captcha_solver::solver::Solver;
use image::{GrayImage, Luma};
use serde::Deserialize;
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::Arc;
use tokio::task::JoinHandle;

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct SolveResponse {
    success: bool,
    text: Option<String>,
    error: Option<String>,
    processing_time_ms: u64,
    candidates: Vec<Value>,
    attempts: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct InfoResponse {
    version: String,
    engine: String,
    available_engines: Vec<Value>,
    strategies: Vec<Value>,
    max_file_size_bytes: usize,
    solve_timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct HealthResponse {
    status: String,
    service: String,
    version: String,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct ErrorResponse {
    success: bool,
    error: String,
    code: String,
}

/// Reads the same text under every configuration
struct FixedEngine(&'static str);

impl OcrEngine for FixedEngine {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn description(&self) -> &'static str {
        "Always reads the same text"
    }

    fn recognize(&self, _image: &GrayImage, _config: &OcrConfig) -> Result<String, OcrError> {
        Ok(self.0.to_string())
    }
}

struct TestServer {
    handle: JoinHandle<()>,
    port: u16,
}

impl TestServer {
    async fn start(reading: &'static str) -> Self {
        let engine = Arc::new(FixedEngine(reading));
        let config = Config::default();
        let engines = vec![EngineInfo {
            name: engine.name(),
            description: engine.description(),
        }];
        let solver = Solver::from_config(engine, &config);
        let app = router(AppState::new(solver, engines, config));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let port = listener.local_addr().unwrap().port();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server failed");
        });

        Self { handle, port }
    }

    fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn captcha_base64() -> String {
    let img = GrayImage::from_fn(80, 30, |x, _| {
        if (x / 8) % 2 == 0 {
            Luma([20])
        } else {
            Luma([235])
        }
    });
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    STANDARD.encode(bytes)
}

async fn post_solve(server: &TestServer, body: Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{}/solve", server.base_url()))
        .json(&body)
        .send()
        .await
        .expect("Failed to send request")
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = TestServer::start("AB12").await;

    let response: HealthResponse = reqwest::get(format!("{}/health", server.base_url()))
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");

    assert_eq!(response.status, "ok");
    assert_eq!(response.service, "captcha-solver");
    assert!(!response.version.is_empty());
}

#[tokio::test]
async fn test_index_lists_endpoints() {
    let server = TestServer::start("AB12").await;

    let response: Value = reqwest::get(format!("{}/", server.base_url()))
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");

    assert!(response["endpoints"]["POST /solve"].is_string());
}

#[tokio::test]
async fn test_info_endpoint() {
    let server = TestServer::start("AB12").await;

    let response: InfoResponse = reqwest::get(format!("{}/info", server.base_url()))
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");

    assert_eq!(response.engine, "fixed");
    assert_eq!(response.available_engines.len(), 1);
    assert_eq!(response.strategies.len(), 4);
    assert_eq!(response.strategies[0]["name"], "advanced-line-alnum");
    assert_eq!(response.max_file_size_bytes, 5 * 1024 * 1024);
}

#[tokio::test]
async fn test_solve_returns_consensus() {
    let server = TestServer::start("ab-12 ").await;

    let response = post_solve(&server, json!({ "image": captcha_base64() })).await;
    assert_eq!(response.status(), 200);

    let result: SolveResponse = response.json().await.expect("Failed to parse response");
    assert!(result.success);
    assert_eq!(result.text.as_deref(), Some("ab12"));
    assert!(result.error.is_none());
    assert_eq!(result.attempts.len(), 4);
}

#[tokio::test]
async fn test_solve_accepts_data_url() {
    let server = TestServer::start("XY9Z").await;

    let image = format!("data:image/png;base64,{}", captcha_base64());
    let result: SolveResponse = post_solve(&server, json!({ "image": image }))
        .await
        .json()
        .await
        .expect("Failed to parse response");

    assert!(result.success);
    assert_eq!(result.text.as_deref(), Some("XY9Z"));
}

#[tokio::test]
async fn test_short_reading_is_not_solved() {
    let server = TestServer::start("A1").await;

    let response = post_solve(&server, json!({ "image": captcha_base64() })).await;
    assert_eq!(response.status(), 200);

    let result: SolveResponse = response.json().await.expect("Failed to parse response");
    assert!(!result.success);
    assert!(result.text.is_none());
    assert_eq!(result.error.as_deref(), Some("Could not solve CAPTCHA"));
}

#[tokio::test]
async fn test_missing_image_is_bad_request() {
    let server = TestServer::start("AB12").await;

    let response = post_solve(&server, json!({ "picture": "abc" })).await;
    assert_eq!(response.status(), 400);

    let error: ErrorResponse = response.json().await.expect("Failed to parse response");
    assert!(!error.success);
    assert_eq!(error.error, "No image provided. Send JSON with 'image' field.");
}

#[tokio::test]
async fn test_non_json_body_is_bad_request() {
    let server = TestServer::start("AB12").await;

    let response = reqwest::Client::new()
        .post(format!("{}/solve", server.base_url()))
        .body("not json")
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_empty_image_is_unsolved() {
    let server = TestServer::start("AB12").await;

    let response = post_solve(&server, json!({ "image": "" })).await;
    assert_eq!(response.status(), 200);

    let result: SolveResponse = response.json().await.expect("Failed to parse response");
    assert!(!result.success);
    assert!(result.text.is_none());
}

#[tokio::test]
async fn test_invalid_base64_is_bad_request() {
    let server = TestServer::start("AB12").await;

    let response = post_solve(&server, json!({ "image": "***not base64***" })).await;
    assert_eq!(response.status(), 400);
}
