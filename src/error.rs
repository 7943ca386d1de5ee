//! # Error Handling
//!
//! This module defines the error taxonomy of the separation function and how each
//! error is turned into an HTTP reply.
//!
//! ## Error Categories:
//! - **ValidationError**: The request is missing its audio payload (400)
//! - **MethodNotAllowed**: Anything other than POST or OPTIONS (405)
//! - **PayloadTooLarge**: The request body exceeds `server.max_body_bytes` (413)
//! - **Internal**: Every other fault - bad JSON, bad base64, storage failures (500)
//!
//! ## JSON Response Format:
//! All errors return the same flat object, with the raw fault message surfaced as-is:
//! ```json
//! { "error": "Audio data required" }
//! ```
//!
//! Validation and method errors are detected before any side effect. Internal errors
//! can happen after the first object was written; nothing is rolled back.

use crate::cors;
use crate::storage::StoreError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

/// Message returned when a POST carries no usable `audio` field.
pub const AUDIO_REQUIRED: &str = "Audio data required";

/// Message returned for methods other than POST and OPTIONS.
pub const METHOD_NOT_ALLOWED: &str = "Method not allowed";

/// Custom error types for the application.
///
/// ## Usage Example:
/// ```rust,ignore
/// return Err(AppError::ValidationError(AUDIO_REQUIRED.to_string()));
/// ```
#[derive(Debug)]
pub enum AppError {
    /// User input failed validation rules
    ValidationError(String),

    /// The HTTP method is not served by the function
    MethodNotAllowed,

    /// Request body larger than the configured limit (limit in bytes)
    PayloadTooLarge(usize),

    /// Any unhandled fault; the message is shown to the caller verbatim
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::MethodNotAllowed => write!(f, "{}", METHOD_NOT_ALLOWED),
            AppError::PayloadTooLarge(limit) => write!(f, "Payload exceeds {} bytes", limit),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// HTTP status code for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,       // 400
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,  // 405
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE, // 413
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,    // 500
        }
    }

    /// The message exactly as it appears in the `error` field of the reply.
    ///
    /// Unlike `Display`, this carries no category prefix.
    pub fn message(&self) -> String {
        match self {
            AppError::ValidationError(msg) | AppError::Internal(msg) => msg.clone(),
            AppError::MethodNotAllowed => METHOD_NOT_ALLOWED.to_string(),
            AppError::PayloadTooLarge(_) => self.to_string(),
        }
    }

    /// The JSON body of the reply.
    pub fn body(&self) -> serde_json::Value {
        json!({ "error": self.message() })
    }
}

/// Lets handlers return `Result<HttpResponse, AppError>` and have actix-web render
/// the error with the same body and CORS origin as the function replies.
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status())
            .insert_header((cors::ALLOW_ORIGIN, cors::ANY_ORIGIN))
            .json(self.body())
    }
}

/// JSON parsing errors are faults of the generic kind: they become a 500 with the
/// parser's message, not a 400.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<base64::DecodeError> for AppError {
    fn from(err: base64::DecodeError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Type alias for Results that use our custom error type.
pub type AppResult<T> = Result<T, AppError>;
