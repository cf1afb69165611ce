use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File too large: {0} bytes, max allowed: {1} bytes")]
    FileTooLarge(usize, usize),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Image decode error: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("ORT error: {0}")]
    Ort(#[from] ort::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl DetectorError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DetectorError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            DetectorError::FileTooLarge(_, _) => StatusCode::PAYLOAD_TOO_LARGE,
            DetectorError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            DetectorError::Base64(_) => StatusCode::BAD_REQUEST,
            DetectorError::Json(_) => StatusCode::BAD_REQUEST,
            DetectorError::ImageDecode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DetectorError::ImageProcessing(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DetectorError::ModelLoad(_) => StatusCode::SERVICE_UNAVAILABLE,
            DetectorError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            DetectorError::ModelLoad(_) => "MODEL_LOAD_ERROR",
            DetectorError::ModelUnavailable(_) => "MODEL_UNAVAILABLE",
            DetectorError::ImageProcessing(_) => "IMAGE_PROCESSING_ERROR",
            DetectorError::Inference(_) => "INFERENCE_ERROR",
            DetectorError::InvalidInput(_) => "INVALID_INPUT",
            DetectorError::FileTooLarge(_, _) => "FILE_TOO_LARGE",
            DetectorError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            DetectorError::Config(_) => "CONFIG_ERROR",
            DetectorError::Io(_) => "IO_ERROR",
            DetectorError::Json(_) => "JSON_ERROR",
            DetectorError::Base64(_) => "BASE64_DECODE_ERROR",
            DetectorError::ImageDecode(_) => "IMAGE_DECODE_ERROR",
            DetectorError::Ort(_) => "ORT_ERROR",
            DetectorError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for DetectorError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_response = serde_json::json!({
            "success": false,
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            },
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        if status.is_server_error() {
            tracing::error!("Request failed: {} ({})", self, status);
        } else {
            tracing::warn!("Request rejected: {} ({})", self, status);
        }

        (status, axum::Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_4xx() {
        let cases = [
            DetectorError::InvalidInput("empty".into()),
            DetectorError::FileTooLarge(11, 10),
            DetectorError::UnsupportedFormat("gif".into()),
            DetectorError::ImageProcessing("zero area".into()),
        ];
        for err in cases {
            assert!(err.status_code().is_client_error(), "{err} should be a client error");
        }
    }

    #[test]
    fn model_errors_map_to_503() {
        assert_eq!(
            DetectorError::ModelUnavailable("not loaded".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            DetectorError::ModelLoad("missing".into()).error_code(),
            "MODEL_LOAD_ERROR"
        );
    }

    #[test]
    fn inference_error_is_server_side() {
        let err = DetectorError::Inference("nan".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.status_code().is_server_error());
    }
}
