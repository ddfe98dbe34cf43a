//! API error handling.
//!
//! Provides consistent error responses for the API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::credentials::CredentialError;
use crate::error::Error;

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

/// API error type that can be converted to HTTP responses.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    /// 502: the remote recruiting API misbehaved.
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorResponse {
            code: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Credential(CredentialError::NotConfigured) => {
                ApiError::forbidden("No Huntflow API token configured")
            }
            Error::Credential(e) => {
                tracing::error!("Credential error: {}", e);
                ApiError::bad_gateway(e.to_string())
            }
            Error::Api { status, message } => {
                tracing::error!("Remote API error {}: {}", status, message);
                ApiError::bad_gateway(format!("Remote API returned {status}"))
            }
            Error::Http(e) => {
                tracing::error!("HTTP error: {}", e);
                ApiError::bad_gateway("Remote API unreachable")
            }
            Error::NoAccounts => ApiError::bad_gateway("No Huntflow account available"),
            Error::Configuration(msg) => ApiError::bad_request(msg),
            e @ (Error::Persistence { .. } | Error::Io(_)) => {
                tracing::error!("Storage error: {}", e);
                ApiError::internal("Failed to persist data")
            }
            other => {
                tracing::error!("Internal error: {}", other);
                ApiError::internal(other.to_string())
            }
        }
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
