//! Error types for Watchpost
//!
//! Pattern adapted from holo-host/rust/holo-gateway/src/types/error.rs

use hyper::StatusCode;

/// Main error type for Watchpost operations
#[derive(Debug, thiserror::Error)]
pub enum WatchpostError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Field-level validation failure, caught before anything is persisted
    #[error("Invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Row-level policy denial
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),
}

impl WatchpostError {
    /// Shorthand for a validation failure on a named field
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Http(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
        }
    }

    /// Stable machine-readable code for clients
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) | Self::Http(_) => "BAD_REQUEST",
            Self::Validation { .. } => "VALIDATION_FAILED",
            Self::Unauthorized(_) | Self::Auth(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            Self::Database(_) | Self::Storage(_) => "BACKEND_UNAVAILABLE",
            Self::Internal(_) | Self::Config(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show to clients.
    ///
    /// Policy denials and backend failures never leak detail; the full error
    /// is logged server-side instead.
    pub fn public_message(&self) -> String {
        match self {
            Self::Forbidden(_) => "Operation not permitted".to_string(),
            Self::Database(_) | Self::Storage(_) | Self::Internal(_) | Self::Config(_) => {
                "Request failed".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Convert to status code and body tuple for HTTP response
    pub fn into_status_code_and_body(self) -> (StatusCode, String) {
        let status = self.status_code();
        let body = self.public_message();
        (status, body)
    }
}

// Implement From conversions for common error types

impl From<std::io::Error> for WatchpostError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for WatchpostError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for WatchpostError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<mongodb::error::Error> for WatchpostError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<bson::ser::Error> for WatchpostError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Database(format!("BSON encoding failed: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for WatchpostError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Unauthorized(format!("JWT error: {}", err))
    }
}

/// Result type alias for Watchpost operations
pub type Result<T> = std::result::Result<T, WatchpostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_hides_detail() {
        let err = WatchpostError::Forbidden("user 42 tried to update report 7".into());
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.public_message(), "Operation not permitted");
    }

    #[test]
    fn test_backend_failures_are_generic() {
        let err = WatchpostError::Database("connection reset by peer".into());
        let (status, body) = err.into_status_code_and_body();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, "Request failed");
    }

    #[test]
    fn test_validation_keeps_field_message() {
        let err = WatchpostError::validation("description", "must be at least 10 characters");
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code(), "VALIDATION_FAILED");
        assert!(err.public_message().contains("description"));
    }
}
