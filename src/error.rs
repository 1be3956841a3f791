use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum OcrError {
    #[error("Failed to initialize OCR engine: {0}")]
    InitializationError(String),

    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Undecodable image: {0}")]
    UndecodableImage(String),

    #[error("Preprocessing failed: {0}")]
    PreprocessingError(String),

    #[error("Recognition failed: {0}")]
    RecognitionError(String),

    #[error("Image too large: {size} bytes (max: {max} bytes)")]
    ImageTooLarge { size: usize, max: usize },

    #[error("Request body too large (max: {max} bytes)")]
    RequestTooLarge { max: usize },

    #[error("No image provided. Send JSON with 'image' field.")]
    MissingImage,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Solve timed out after {0}s")]
    Timeout(u64),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OcrError {
    /// Whether this failure means no engine call can succeed, as opposed to
    /// one attempt going wrong.
    pub fn is_engine_unavailable(&self) -> bool {
        matches!(self, OcrError::EngineUnavailable(_))
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
}

impl IntoResponse for OcrError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            OcrError::InitializationError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INIT_ERROR"),
            OcrError::EngineUnavailable(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "ENGINE_UNAVAILABLE")
            }
            OcrError::UndecodableImage(_) => (StatusCode::BAD_REQUEST, "UNDECODABLE_IMAGE"),
            OcrError::PreprocessingError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "PREPROCESSING_ERROR")
            }
            OcrError::RecognitionError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "RECOGNITION_ERROR")
            }
            OcrError::ImageTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "IMAGE_TOO_LARGE"),
            OcrError::RequestTooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, "REQUEST_TOO_LARGE")
            }
            OcrError::MissingImage => (StatusCode::BAD_REQUEST, "MISSING_IMAGE"),
            OcrError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            OcrError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
            OcrError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(ErrorResponse {
            success: false,
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_image_is_bad_request() {
        let response = OcrError::MissingImage.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_engine_unavailable_is_server_error() {
        let err = OcrError::EngineUnavailable("tessdata missing".to_string());
        assert!(err.is_engine_unavailable());
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_too_large_message_names_limit() {
        let err = OcrError::ImageTooLarge { size: 10, max: 5 };
        assert_eq!(err.to_string(), "Image too large: 10 bytes (max: 5 bytes)");
    }
}
