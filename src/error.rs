// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Bad input, or the identity store rejected a create/update.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Unknown identity or credential mismatch. The message is the same
    /// for both cases so callers cannot probe which accounts exist.
    #[error("{0}")]
    Authentication(String),

    /// An external identity token that could not be parsed, or that is
    /// missing a required claim.
    #[error("Invalid token format: {0}")]
    TokenFormat(String),

    /// Catch-all wrapper for federated-login failures. Callers of the
    /// google-login endpoint only ever see this shape.
    #[error("Invalid Google token: {0}")]
    TokenValidation(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// The uniform local-login failure. Identity-not-found and
    /// wrong-password are indistinguishable to the caller.
    pub fn invalid_credentials() -> Self {
        AppError::Authentication("Invalid credentials".to_string())
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", Some(msg.clone()))
            }
            AppError::Authentication(msg) => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                Some(msg.clone()),
            ),
            AppError::TokenFormat(msg) => (
                StatusCode::UNAUTHORIZED,
                "token_format_error",
                Some(msg.clone()),
            ),
            AppError::TokenValidation(msg) => (
                StatusCode::UNAUTHORIZED,
                "token_validation_error",
                Some(msg.clone()),
            ),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
