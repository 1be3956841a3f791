use crate::config::Config;
use crate::engines::{EngineInfo, EngineRegistry};
use crate::error::OcrError;
use crate::solver::{AttemptReport, Solver, StrategyInfo, Tally};
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub solver: Arc<Solver>,
    pub engines: Arc<Vec<EngineInfo>>,
    pub config: Arc<Config>,
    /// Bounds how many solves run on the blocking pool at once
    pub permits: Arc<Semaphore>,
}

impl AppState {
    pub fn new(solver: Solver, engines: Vec<EngineInfo>, config: Config) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_solves.max(1)));
        Self {
            solver: Arc::new(solver),
            engines: Arc::new(engines),
            config: Arc::new(config),
            permits,
        }
    }
}

/// Solve request body
#[derive(Deserialize)]
pub struct SolveRequest {
    pub image: Option<String>,
}

/// Solve response
#[derive(Serialize)]
pub struct SolveResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub processing_time_ms: u64,
    pub candidates: Vec<Tally>,
    pub attempts: Vec<AttemptReport>,
}

impl SolveResponse {
    fn unsolved(error: String, processing_time_ms: u64) -> Self {
        Self {
            success: false,
            text: None,
            error: Some(error),
            processing_time_ms,
            candidates: Vec::new(),
            attempts: Vec::new(),
        }
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub engine: String,
    pub available_engines: Vec<EngineInfo>,
    pub strategies: Vec<StrategyInfo>,
    pub max_file_size_bytes: usize,
    pub solve_timeout_secs: u64,
}

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    config.validate().map_err(anyhow::Error::msg)?;

    let registry = EngineRegistry::new(&config)?;
    let engine = registry
        .default_engine()
        .ok_or_else(|| OcrError::InitializationError("No default engine".to_string()))?;
    tracing::info!(
        "Using '{}' engine (available: {})",
        registry.default_name(),
        registry.list().join(", ")
    );

    let solver = Solver::from_config(engine, &config);
    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(solver, registry.info(), config);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, router(state)).await?;

    Ok(())
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let max_file_size = state.config.max_file_size;

    Router::new()
        .route("/", get(handle_index))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .route("/solve", post(handle_solve))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(DefaultBodyLimit::max(body_limit(max_file_size))),
        )
        .with_state(state)
}

/// Largest accepted request body: base64 inflates the image by a third
fn body_limit(max_file_size: usize) -> usize {
    max_file_size / 3 * 4 + 1024
}

/// Handle solve requests
async fn handle_solve(
    State(state): State<AppState>,
    payload: Result<Json<SolveRequest>, JsonRejection>,
) -> Result<Json<SolveResponse>, OcrError> {
    let start = Instant::now();

    let image = match payload {
        Ok(Json(SolveRequest { image: Some(image) })) => image,
        Ok(_) => return Err(OcrError::MissingImage),
        Err(JsonRejection::BytesRejection(rejection))
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE =>
        {
            tracing::warn!("Rejected oversized solve request: {}", rejection);
            return Err(OcrError::RequestTooLarge {
                max: body_limit(state.config.max_file_size),
            });
        }
        Err(rejection) => {
            tracing::warn!("Rejected solve request: {}", rejection);
            return Err(OcrError::MissingImage);
        }
    };

    let bytes = decode_image_payload(&image)?;

    if bytes.len() > state.config.max_file_size {
        return Err(OcrError::ImageTooLarge {
            size: bytes.len(),
            max: state.config.max_file_size,
        });
    }

    let permit = state
        .permits
        .clone()
        .acquire_owned()
        .await
        .map_err(|e| OcrError::Internal(format!("Solver pool closed: {}", e)))?;

    let solver = state.solver.clone();
    let timeout = state.config.solve_timeout;
    // The permit lives as long as the blocking work, even past a timeout
    let task = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        solver.solve(&bytes)
    });

    let solution = match tokio::time::timeout(timeout, task).await {
        Ok(joined) => {
            joined.map_err(|e| OcrError::Internal(format!("Solver task failed: {}", e)))??
        }
        Err(_) => {
            let err = OcrError::Timeout(timeout.as_secs());
            tracing::warn!("✗ {}", err);
            return Ok(Json(SolveResponse::unsolved(
                err.to_string(),
                elapsed_ms(start),
            )));
        }
    };

    let processing_time_ms = elapsed_ms(start);

    Ok(Json(match solution.text {
        Some(text) => {
            tracing::info!("✓ Solved: {} in {}ms", text, processing_time_ms);
            SolveResponse {
                success: true,
                text: Some(text),
                error: None,
                processing_time_ms,
                candidates: solution.candidates,
                attempts: solution.attempts,
            }
        }
        None => {
            tracing::info!("✗ Could not solve ({}ms)", processing_time_ms);
            SolveResponse {
                success: false,
                text: None,
                error: Some("Could not solve CAPTCHA".to_string()),
                processing_time_ms,
                candidates: solution.candidates,
                attempts: solution.attempts,
            }
        }
    }))
}

/// Strip an optional `data:<mime>;base64,` prefix and decode the base64 payload
pub fn decode_image_payload(image: &str) -> Result<Vec<u8>, OcrError> {
    let encoded = match image.split_once(',') {
        Some((_, data)) => data,
        None => image,
    };

    // Encoders commonly wrap lines at 76 columns
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    STANDARD
        .decode(compact)
        .map_err(|e| OcrError::InvalidRequest(format!("Invalid base64 image: {}", e)))
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "captcha-solver".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        engine: state.solver.engine_name().to_string(),
        available_engines: state.engines.as_ref().clone(),
        strategies: state.solver.strategies().info(),
        max_file_size_bytes: state.config.max_file_size,
        solve_timeout_secs: state.config.solve_timeout.as_secs(),
    })
}

/// Root endpoint with API documentation
async fn handle_index(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "name": "Captcha Solver",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "A free, self-hosted CAPTCHA solver using OCR",
        "endpoints": {
            "GET /": "This documentation",
            "GET /health": "Health check",
            "GET /info": "Engine and strategy details",
            "POST /solve": "Solve CAPTCHA (send JSON with base64 'image')"
        },
        "example": {
            "curl": format!(
                "curl -X POST http://{}:{}/solve -H 'Content-Type: application/json' -d '{{\"image\": \"<base64_image>\"}}'",
                state.config.host, state.config.port
            )
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{OcrConfig, OcrEngine};
    use axum::body::Body;
    use axum::http::Request;
    use image::GrayImage;
    use tower::ServiceExt;

    struct SilentEngine;

    impl OcrEngine for SilentEngine {
        fn name(&self) -> &'static str {
            "silent"
        }

        fn description(&self) -> &'static str {
            "Never reads anything"
        }

        fn recognize(&self, _image: &GrayImage, _config: &OcrConfig) -> Result<String, OcrError> {
            Ok(String::new())
        }
    }

    fn app(config: Config) -> Router {
        let solver = Solver::from_config(Arc::new(SilentEngine), &config);
        router(AppState::new(solver, Vec::new(), config))
    }

    fn solve_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/solve")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_route() {
        let response = app(Config::default())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_image_field() {
        let response = app(Config::default())
            .oneshot(solve_request("{}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], "MISSING_IMAGE");
    }

    #[tokio::test]
    async fn test_decoded_image_over_limit() {
        let config = Config {
            max_file_size: 4,
            ..Config::default()
        };
        // 6 decoded bytes against a 4 byte limit, well under the body limit
        let response = app(config)
            .oneshot(solve_request(r#"{"image": "aGVsbG8h"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_oversized_body_is_payload_too_large() {
        let config = Config {
            max_file_size: 300,
            ..Config::default()
        };
        let body = format!(r#"{{"image": "{}"}}"#, "A".repeat(4096));
        let response = app(config).oneshot(solve_request(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "REQUEST_TOO_LARGE");
    }

    #[tokio::test]
    async fn test_unreadable_image_is_unsolved() {
        let response = app(Config::default())
            .oneshot(solve_request(r#"{"image": "aGVsbG8h"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["attempts"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_decodes_raw_base64() {
        assert_eq!(decode_image_payload("aGVsbG8=").unwrap(), b"hello");
    }

    #[test]
    fn test_strips_data_url_prefix() {
        assert_eq!(
            decode_image_payload("data:image/png;base64,aGVsbG8=").unwrap(),
            b"hello"
        );
    }

    #[test]
    fn test_line_wrapped_base64_is_accepted() {
        let data: Vec<u8> = (0..120u8).collect();
        let encoded = STANDARD.encode(&data);
        let wrapped = format!("{}\n{}\r\n", &encoded[..76], &encoded[76..]);

        assert_eq!(decode_image_payload(&wrapped).unwrap(), data);
        assert_eq!(
            decode_image_payload(&format!("data:image/png;base64,{}", wrapped)).unwrap(),
            data
        );
    }

    #[test]
    fn test_empty_payload_decodes_to_nothing() {
        assert!(decode_image_payload("").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_base64_is_rejected() {
        assert!(matches!(
            decode_image_payload("not base64!!"),
            Err(OcrError::InvalidRequest(_))
        ));
    }
}
