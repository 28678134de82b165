//! Error types for the Macguffin backend
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::context::Interrupted;
use crate::data::StoreError;

/// Application-wide error type
///
/// This enum represents all possible errors that can occur
/// in the application. It implements `IntoResponse` to
/// automatically convert errors to appropriate HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Authentication required (401)
    #[error("Authentication required")]
    Unauthorized,

    /// Client token unknown or expired (401)
    #[error("Token has expired")]
    TokenExpired,

    /// Validation error (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Identity provider refused or answered badly (502)
    #[error("Identity provider error: {0}")]
    Provider(String),

    /// HTTP client error (502)
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Storage error (500)
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Records that should exist together do not (500)
    #[error("Inconsistent state: {0}")]
    InconsistentState(String),

    /// Request cancelled or past its deadline (408)
    #[error("Request interrupted: {0}")]
    Cancelled(Interrupted),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable label used in logs and the error counter
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "unauthorized",
            AppError::TokenExpired => "token_expired",
            AppError::Validation(_) => "validation",
            AppError::Provider(_) => "provider",
            AppError::HttpClient(_) => "http_client",
            AppError::Store(_) => "store",
            AppError::InconsistentState(_) => "inconsistent_state",
            AppError::Cancelled(_) => "cancelled",
            AppError::Config(_) => "config",
            AppError::Internal(_) => "internal",
        }
    }

    /// Lift a storage error, keeping interruptions distinct from failures.
    pub fn from_store(err: StoreError) -> Self {
        match err {
            StoreError::Interrupted(reason) => AppError::Cancelled(reason),
            other => AppError::Store(other),
        }
    }
}

impl From<Interrupted> for AppError {
    fn from(reason: Interrupted) -> Self {
        AppError::Cancelled(reason)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Maps each error variant to appropriate HTTP status code
    /// and JSON error body.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_message) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::TokenExpired => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Provider(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::HttpClient(_) => (
                StatusCode::BAD_GATEWAY,
                "Identity provider unreachable".to_string(),
            ),
            AppError::Cancelled(_) => (StatusCode::REQUEST_TIMEOUT, self.to_string()),
            AppError::Store(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Storage error".to_string(),
            ),
            AppError::InconsistentState(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Inconsistent state".to_string(),
            ),
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, error_type = self.error_type(), "Request failed");
        } else {
            tracing::debug!(error = %self, error_type = self.error_type(), "Request rejected");
        }

        // Record error metric
        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL
            .with_label_values(&[self.error_type()])
            .inc();

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (AppError::TokenExpired, StatusCode::UNAUTHORIZED),
            (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
            (AppError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (AppError::Provider("down".into()), StatusCode::BAD_GATEWAY),
            (
                AppError::Internal(anyhow::anyhow!("unreadable record")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::InconsistentState("orphan token".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::Cancelled(Interrupted::DeadlineExceeded),
                StatusCode::REQUEST_TIMEOUT,
            ),
            (
                AppError::Store(StoreError::NoDocuments),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn from_store_separates_interruptions() {
        assert!(matches!(
            AppError::from_store(StoreError::Interrupted(Interrupted::Cancelled)),
            AppError::Cancelled(Interrupted::Cancelled)
        ));
        assert!(matches!(
            AppError::from_store(StoreError::NoDocuments),
            AppError::Store(StoreError::NoDocuments)
        ));
    }
}
