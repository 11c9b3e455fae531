//! Error handling for the bookshelf HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

const HIDDEN_INTERNAL_MESSAGE: &str = "An internal server error occurred";

/// Standard error body shared by REST responses
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub details: Vec<serde_json::Value>,
    pub message: String,
    pub code: String,
    pub trace_id: String,
    pub timestamp: String,
}

/// Application error types that map to HTTP responses and GraphQL errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation error: {message}")]
    Validation {
        details: Vec<serde_json::Value>,
        code: String,
        message: String,
    },

    #[error("not found: {message}")]
    NotFound { message: String, code: String },

    #[error("unauthorized: {message}")]
    Unauthorized { message: String, code: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a validation error
    pub fn validation(details: Vec<serde_json::Value>, message: impl Into<String>) -> Self {
        Self::Validation {
            details,
            code: "validation_error".to_string(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            code: "not_found".to_string(),
        }
    }

    /// Create an unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
            code: "unauthorized".to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            AppError::Validation { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Unauthorized { code, .. } => code,
            AppError::Internal(_) => "internal_error",
        }
    }

    /// Message safe to hand to clients; internal details stay in the logs in release builds.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Unauthorized { message, .. } => message.clone(),
            AppError::Internal(err) => {
                if cfg!(debug_assertions) {
                    err.to_string()
                } else {
                    HIDDEN_INTERNAL_MESSAGE.to_string()
                }
            }
        }
    }

    pub fn details(&self) -> &[serde_json::Value] {
        match self {
            AppError::Validation { details, .. } => details,
            _ => &[],
        }
    }

    /// Build the error body and log it under a fresh trace id
    pub fn to_body(&self) -> ErrorBody {
        let trace_id = Uuid::new_v4().to_string();
        let timestamp = OffsetDateTime::now_utc().to_string();

        match self {
            AppError::Internal(err) => tracing::error!(
                trace_id = %trace_id,
                error_code = %self.code(),
                error = %err,
                "request failed"
            ),
            _ => tracing::warn!(
                trace_id = %trace_id,
                error_code = %self.code(),
                status_code = %self.status().as_u16(),
                "request rejected"
            ),
        }

        ErrorBody {
            details: self.details().to_vec(),
            message: self.public_message(),
            code: self.code().to_string(),
            trace_id,
            timestamp,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = self.to_body();
        (status, Json(json!({ "error": body }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let details = vec![serde_json::json!({"field": "name", "error": "too long"})];
        let error = AppError::validation(details.clone(), "Validation failed");

        match &error {
            AppError::Validation {
                details: d,
                code,
                message,
            } => {
                assert_eq!(d, &details);
                assert_eq!(code, "validation_error");
                assert_eq!(message, "Validation failed");
            }
            _ => panic!("Expected Validation error"),
        }
        assert_eq!(error.details(), details.as_slice());
    }

    #[test]
    fn test_status_and_code_mapping() {
        let cases = [
            (AppError::not_found("gone"), StatusCode::NOT_FOUND, "not_found"),
            (
                AppError::unauthorized("no token"),
                StatusCode::UNAUTHORIZED,
                "unauthorized",
            ),
            (
                AppError::Internal(anyhow::anyhow!("disk full")),
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
            ),
        ];
        for (error, status, code) in cases {
            assert_eq!(error.status(), status);
            assert_eq!(error.code(), code);
        }
    }

    #[test]
    fn test_error_response_mapping() {
        let response = AppError::not_found("Resource not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_error_response_format() {
        let response = AppError::not_found("Book not found with ID: 7").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let error = &body["error"];
        assert_eq!(error["code"], "not_found");
        assert_eq!(error["message"], "Book not found with ID: 7");
        assert_eq!(error["details"], serde_json::json!([]));
        assert!(Uuid::parse_str(error["trace_id"].as_str().unwrap()).is_ok());
        assert!(error["timestamp"].as_str().is_some());
    }
}
