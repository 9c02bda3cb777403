// crates/test-ledger-api/src/error.rs
// ============================================================================
// Module: API Errors
// Description: Error taxonomy and HTTP error normalization.
// Purpose: Map every failure to one status code and `{"error": ...}` body.
// Dependencies: axum, serde_json, thiserror, tracing, test-ledger-core
// ============================================================================

//! ## Overview
//! Every handler returns [`ApiError`] on failure. Client-class errors surface
//! their message verbatim; the 500 tier logs its detail through `tracing` and
//! replaces it with a fixed caller-facing message. The message that reached
//! the caller is attached to the response as an [`ErrorNote`] extension so
//! the request logger can record it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;

use axum::Json;
use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use serde_json::json;
use test_ledger_core::StoreError;
use thiserror::Error;

// ============================================================================
// SECTION: Messages
// ============================================================================

/// Caller-facing message for persistence failures.
pub const DATABASE_ERROR_MESSAGE: &str =
    "An unexpected database error occurred. Please try again later.";
/// Caller-facing message for internal failures.
pub const INTERNAL_ERROR_MESSAGE: &str =
    "An internal server error occurred. Please try again later.";
/// Caller-facing message for anything uncaught.
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred. Please try again later.";

// ============================================================================
// SECTION: Error Types
// ============================================================================

/// API failure taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Malformed or incomplete input (400).
    #[error("{0}")]
    Validation(String),
    /// Missing, invalid or insufficient identity (401).
    #[error("{0}")]
    Auth(String),
    /// Unknown record or route (404).
    #[error("{0}")]
    NotFound(String),
    /// Uniqueness violation (400).
    #[error("{0}")]
    Conflict(String),
    /// Request body over the configured limit (413).
    #[error("{0}")]
    PayloadTooLarge(String),
    /// Route exists but not for this method (405).
    #[error("{0}")]
    MethodNotAllowed(String),
    /// Persistence failure; detail is never returned to the caller.
    #[error("database error: {0}")]
    Database(String),
    /// Internal failure; detail is never returned to the caller.
    #[error("internal error: {0}")]
    Internal(String),
    /// Uncaught failure; detail is never returned to the caller.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl ApiError {
    /// Returns the HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Conflict(_) => StatusCode::BAD_REQUEST,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Database(_) | Self::Internal(_) | Self::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the message shown to the caller.
    #[must_use]
    pub fn public_message(&self) -> &str {
        match self {
            Self::Validation(message)
            | Self::Auth(message)
            | Self::NotFound(message)
            | Self::Conflict(message)
            | Self::PayloadTooLarge(message)
            | Self::MethodNotAllowed(message) => message,
            Self::Database(_) => DATABASE_ERROR_MESSAGE,
            Self::Internal(_) => INTERNAL_ERROR_MESSAGE,
            Self::Unexpected(_) => UNEXPECTED_ERROR_MESSAGE,
        }
    }

    /// Maps a body extraction rejection to an API error.
    #[must_use]
    pub fn from_body_rejection(rejection: &BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge("Request body too large".to_string())
        } else {
            Self::Validation("Invalid request body".to_string())
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        Self::Database(error.to_string())
    }
}

// ============================================================================
// SECTION: Responses
// ============================================================================

/// Caller-facing error message attached to error responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNote(pub String);

/// Builds the `{"error": message}` response with its [`ErrorNote`].
fn error_response(status: StatusCode, message: &str) -> Response {
    let mut response = (status, Json(json!({ "error": message }))).into_response();
    response.extensions_mut().insert(ErrorNote(message.to_string()));
    response
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        error_response(status, self.public_message())
    }
}

/// Converts a caught handler panic into the generic 500 response.
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("non-string panic payload");
    ApiError::Unexpected(detail.to_string()).into_response()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
