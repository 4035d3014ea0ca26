//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::store::StoreError;

/// Application-wide error type.
///
/// This enum represents all possible errors that can occur while handling a
/// request. Each variant maps to a specific HTTP status code and error message.
///
/// # Error Categories
///
/// - **Store Errors**: Constraint violations and database failures from the device store
/// - **Authentication Errors**: Invalid device API keys or admin tokens
/// - **Authorization Errors**: Inactive devices or disallowed peer addresses
/// - **Resource Errors**: Requested devices not found
/// - **Validation Errors**: Invalid request data
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Device store operation failed.
    ///
    /// Constraint violations map to 4xx responses; anything else is a 500.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Device API key is missing or unknown.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid API key")]
    InvalidApiKey,

    /// Admin token is missing or wrong.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Unauthorized")]
    Unauthorized,

    /// The device exists but has been deactivated.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("Device is inactive")]
    DeviceInactive,

    /// The peer address is not in the device's allowed list.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("Request address is not allowed for this device")]
    IpNotAllowed,

    /// Requested device does not exist.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Device not found")]
    DeviceNotFound,

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    /// The String contains details about what was invalid.
    #[error("Invalid request")]
    InvalidRequest(String),
}

impl AppError {
    /// HTTP status, error code and client-facing message for this error.
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::InvalidApiKey => (
                StatusCode::UNAUTHORIZED,
                "invalid_api_key",
                self.to_string(),
            ),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string()),
            AppError::DeviceInactive => (StatusCode::FORBIDDEN, "device_inactive", self.to_string()),
            AppError::IpNotAllowed => (StatusCode::FORBIDDEN, "ip_not_allowed", self.to_string()),
            AppError::DeviceNotFound => {
                (StatusCode::NOT_FOUND, "device_not_found", self.to_string())
            }
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::Store(StoreError::UniqueViolation { .. }) => {
                (StatusCode::CONFLICT, "conflict", self.to_string())
            }
            AppError::Store(StoreError::MissingField { .. }) => {
                (StatusCode::BAD_REQUEST, "invalid_request", self.to_string())
            }
            AppError::Store(StoreError::UnknownReference { .. }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "unknown_reference",
                self.to_string(),
            ),
            AppError::Store(StoreError::Database(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred".to_string(),
            ),
        }
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// Database failure details are logged and never sent to the client.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
