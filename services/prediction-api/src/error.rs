use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Errors returned to HTTP callers. Server-side variants carry fixed messages;
/// the underlying cause is only logged.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{detail}")]
    Validation { status: StatusCode, detail: String },
    #[error("model is not loaded")]
    NotReady,
    #[error("model inference failed")]
    Inference,
    #[error("model inference timed out")]
    InferenceTimeout,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    detail: String,
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::NotReady => "model_unavailable",
            Self::Inference => "inference_error",
            Self::InferenceTimeout => "inference_timeout",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { status, .. } => *status,
            Self::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            Self::Inference => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InferenceTimeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation { status: rejection.status(), detail: rejection.body_text() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody { error: self.kind(), detail: self.to_string() };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_and_kind_mapping() {
        let cases = [
            (ApiError::Validation { status: StatusCode::UNPROCESSABLE_ENTITY, detail: "x".into() }, 422, "validation_error"),
            (ApiError::NotReady, 503, "model_unavailable"),
            (ApiError::Inference, 500, "inference_error"),
            (ApiError::InferenceTimeout, 504, "inference_timeout"),
        ];
        for (err, status, kind) in cases {
            assert_eq!(err.status().as_u16(), status);
            assert_eq!(err.kind(), kind);
        }
    }

    #[tokio::test]
    async fn response_carries_kind_and_detail() {
        let resp = ApiError::NotReady.into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, serde_json::json!({"error": "model_unavailable", "detail": "model is not loaded"}));
    }

    #[tokio::test]
    async fn validation_detail_is_echoed() {
        let err = ApiError::Validation { status: StatusCode::UNPROCESSABLE_ENTITY, detail: "missing field `Age`".into() };
        let bytes = axum::body::to_bytes(err.into_response().into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, serde_json::json!({"error": "validation_error", "detail": "missing field `Age`"}));
    }
}
