// SPDX-License-Identifier: MIT

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Machine-readable code attached to the 401 body when the access token
/// is expired (as opposed to malformed or tampered). This is the one
/// signal the companion client's gateway reacts to with a refresh.
pub const TOKEN_EXPIRED_CODE: &str = "TOKEN_EXPIRED";

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Refresh token not found")]
    RefreshNotFound,

    #[error("Refresh token expired")]
    RefreshExpired,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Transcription service error: {0}")]
    Upstream(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, code, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None, None),
            // Unknown email and wrong password produce the same body so the
            // endpoint cannot be used for account enumeration.
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "invalid_credentials", None, None)
            }
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None, None),
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "token_expired",
                Some(TOKEN_EXPIRED_CODE.to_string()),
                None,
            ),
            AppError::RefreshNotFound => (
                StatusCode::UNAUTHORIZED,
                "refresh_token_not_found",
                None,
                None,
            ),
            AppError::RefreshExpired => (
                StatusCode::UNAUTHORIZED,
                "refresh_token_expired",
                None,
                None,
            ),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                None,
                Some(msg.clone()),
            ),
            AppError::DuplicateEmail => (StatusCode::CONFLICT, "duplicate_email", None, None),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "bad_request",
                None,
                Some(msg.clone()),
            ),
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, "not_found", None, Some(msg.clone()))
            }
            AppError::Upstream(msg) => {
                tracing::warn!(error = %msg, "Transcription service error");
                (
                    StatusCode::BAD_GATEWAY,
                    "transcription_error",
                    None,
                    Some(msg.clone()),
                )
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    None,
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            code,
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
