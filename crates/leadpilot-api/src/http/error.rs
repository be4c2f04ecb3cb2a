//! Application error type mapping to HTTP status codes and a JSON error body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use leadpilot_core::orchestrator::RoundError;
use leadpilot_types::error::{CacheError, RepositoryError};
use leadpilot_types::llm::LlmError;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// A chat round failed.
    Round(RoundError),
    /// The session cache is unreachable.
    Cache(CacheError),
    /// Durable storage failed.
    Repository(RepositoryError),
    /// The request body or path is invalid.
    Validation(String),
    /// Nothing is stored for the requested visitor.
    NotFound(String),
}

impl From<RoundError> for AppError {
    fn from(e: RoundError) -> Self {
        AppError::Round(e)
    }
}

impl From<CacheError> for AppError {
    fn from(e: CacheError) -> Self {
        AppError::Cache(e)
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        AppError::Repository(e)
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Round(RoundError::EmptyMessage) => {
                (StatusCode::BAD_REQUEST, "EMPTY_MESSAGE", "Empty message".to_string())
            }
            AppError::Round(RoundError::Llm(LlmError::RateLimited { .. })) => {
                (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED", self.to_message())
            }
            AppError::Round(RoundError::Llm(LlmError::AuthenticationFailed)) => {
                (StatusCode::BAD_GATEWAY, "PROVIDER_AUTH_FAILED", self.to_message())
            }
            AppError::Round(RoundError::Llm(_)) => {
                (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", self.to_message())
            }
            AppError::Cache(e) => {
                (StatusCode::SERVICE_UNAVAILABLE, "CACHE_UNAVAILABLE", e.to_string())
            }
            AppError::Repository(RepositoryError::NotFound) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", "Not found".to_string())
            }
            AppError::Repository(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", e.to_string())
            }
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
        }
    }

    fn to_message(&self) -> String {
        match self {
            AppError::Round(e) => e.to_string(),
            AppError::Cache(e) => e.to_string(),
            AppError::Repository(e) => e.to_string(),
            AppError::Validation(msg) | AppError::NotFound(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(code, %message, "request failed");
        }

        let body = json!({
            "error": {
                "code": code,
                "message": message,
            }
        });

        (status, axum::Json(body)).into_response()
    }
}
