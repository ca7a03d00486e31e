//! Error Mapping
//!
//! Every failure on a request path ends up here as an [`ApiError`] and
//! leaves the server as a JSON [`ErrorEnvelope`].

use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use data_validator::ValidationError;
use inference_engine::InferenceError;
use serde::{Deserialize, Serialize};
use std::any::Any;
use thiserror::Error;
use tracing::{error, warn};

/// Body of every error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
}

/// Failures surfaced to HTTP clients
#[derive(Debug, Error)]
pub enum ApiError {
    /// Client sent unusable feature data
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Encoding, backend, or decoding stage failed
    #[error(transparent)]
    Inference(#[from] InferenceError),

    /// Request rejected before validation, e.g. an oversized body
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    /// Anything else
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Rejected { status, .. } => *status,
            ApiError::Inference(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation",
            ApiError::Inference(e) => e.kind(),
            ApiError::Rejected { .. } => "rejected",
            ApiError::Internal(_) => "internal",
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::Rejected {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            error!(kind = self.kind(), status = status.as_u16(), %message, "Request failed");
        } else {
            warn!(kind = self.kind(), status = status.as_u16(), %message, "Request rejected");
        }

        (status, Json(ErrorEnvelope { error: message })).into_response()
    }
}

/// Message sent to clients when a handler panics
pub const PANIC_MESSAGE: &str = "Internal server error";

/// Turn a handler panic into a 500 envelope instead of a dropped connection.
/// The panic payload is logged, never sent to the client.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        *s
    } else {
        "unknown panic"
    };
    error!(panic = %detail, "Handler panicked");

    ApiError::Internal(PANIC_MESSAGE.to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wire_codec::CodecError;

    #[test]
    fn test_validation_maps_to_400() {
        let err = ApiError::from(ValidationError::NoFeatures);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "No features provided");
    }

    #[test]
    fn test_inference_errors_map_to_500() {
        let errors = [
            InferenceError::Encoding(CodecError::NonFiniteValue {
                row: 0,
                column: 0,
                value: f64::NAN,
            }),
            InferenceError::Backend("connection refused".into()),
            InferenceError::Decoding(CodecError::InvalidToken {
                position: 0,
                token: "abc".into(),
            }),
            InferenceError::PredictionCountMismatch {
                expected: 2,
                actual: 1,
            },
        ];
        for err in errors {
            let err = ApiError::from(err);
            assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert!(!err.to_string().is_empty());
        }
    }

    #[test]
    fn test_rejected_keeps_status() {
        let err = ApiError::Rejected {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: "too big".into(),
        };
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.kind(), "rejected");
    }

    #[tokio::test]
    async fn test_panic_response_hides_payload() {
        let panics: Vec<Box<dyn Any + Send>> = vec![
            Box::new("secret detail"),
            Box::new(String::from("secret detail")),
            Box::new(42_u32),
        ];
        for panic in panics {
            let response = panic_response(panic);
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

            let body = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let envelope: ErrorEnvelope = serde_json::from_slice(&body).unwrap();
            assert_eq!(envelope.error, PANIC_MESSAGE);
        }
    }
}
