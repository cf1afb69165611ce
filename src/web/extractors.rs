use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;

/// 验证的JSON提取器
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ValidationError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|err| {
            if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ValidationError::TooLarge(err.body_text())
            } else {
                ValidationError::JsonParse(err.body_text())
            }
        })?;

        value
            .validate()
            .map_err(|e| ValidationError::Validation(e.to_string()))?;

        Ok(ValidatedJson(value))
    }
}

/// 验证trait
pub trait Validate {
    type Error: std::fmt::Display;

    fn validate(&self) -> Result<(), Self::Error>;
}

/// 验证错误类型
#[derive(Debug)]
pub enum ValidationError {
    JsonParse(String),
    Validation(String),
    /// 请求体超过服务器上限
    TooLarge(String),
}

impl ValidationError {
    fn status_code(&self) -> StatusCode {
        match self {
            ValidationError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ValidationError::TooLarge(_) => "FILE_TOO_LARGE",
            _ => "VALIDATION_ERROR",
        }
    }
}

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        tracing::warn!("Request rejected: {}", self);

        let body = serde_json::json!({
            "success": false,
            "error": {
                "code": self.error_code(),
                "message": self.to_string()
            },
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        (self.status_code(), Json(body)).into_response()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::JsonParse(msg) => write!(f, "JSON parse error: {}", msg),
            ValidationError::Validation(msg) => write!(f, "Validation error: {}", msg),
            ValidationError::TooLarge(msg) => write!(f, "Request body too large: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

/// 为预测请求实现验证
impl Validate for crate::web::handlers::PredictJsonRequest {
    type Error = String;

    fn validate(&self) -> Result<(), Self::Error> {
        if self.image.trim().is_empty() {
            return Err("Image data cannot be empty".to_string());
        }

        if let Some(ref filename) = self.filename {
            if filename.len() > 255 {
                return Err("Filename is longer than 255 bytes".to_string());
            }
        }

        Ok(())
    }
}

/// 请求ID提取器，优先使用客户端提供的 X-Request-ID
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let request_id = parts
            .headers
            .get("X-Request-ID")
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty() && value.len() <= 128)
            .map(|s| s.to_string())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Ok(RequestId(request_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::handlers::PredictJsonRequest;

    #[test]
    fn blank_image_fails_validation() {
        let req = PredictJsonRequest {
            image: "   ".into(),
            filename: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn overlong_filename_fails_validation() {
        let req = PredictJsonRequest {
            image: "abcd".into(),
            filename: Some(format!("{}.png", "a".repeat(300))),
        };
        assert!(req.validate().is_err());

        let ok = PredictJsonRequest {
            image: "abcd".into(),
            filename: Some("leaf.png".into()),
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn oversized_body_maps_to_413() {
        let response = ValidationError::TooLarge("length limit exceeded".into()).into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let response = ValidationError::JsonParse("expected value".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
