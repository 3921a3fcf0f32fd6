//! Unified error handling with Sentry integration.
//!
//! Services and route handlers return `Result<T, AppError>`. Each variant
//! maps to one HTTP status; server-side failures are captured to Sentry and
//! their details are never sent to the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::crypto::CryptoError;
use crate::db::RepositoryError;
use crate::marketplace::MarketplaceError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or illegal input the caller can fix.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or invalid API token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Entity exists but belongs to someone else.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Entity absent, or not owned where existence must not leak.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate of an existing entity.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Marketplace provider failure.
    #[error("Upstream error: {0}")]
    Upstream(MarketplaceError),

    /// Missing credential or setting.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Token encryption or decryption failed.
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(RepositoryError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("resource not found".to_string()),
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Database(other),
        }
    }
}

impl From<MarketplaceError> for AppError {
    fn from(err: MarketplaceError) -> Self {
        if err.is_upstream() {
            return Self::Upstream(err);
        }
        Self::Configuration(err.to_string())
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Configuration(_) | Self::Crypto(_) | Self::Database(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(
            self,
            Self::Configuration(_)
                | Self::Crypto(_)
                | Self::Database(_)
                | Self::Internal(_)
                | Self::Upstream(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Configuration(_) | Self::Crypto(_) | Self::Database(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            Self::Upstream(_) => "Marketplace request failed".to_string(),
            _ => self.to_string(),
        };

        (
            self.status(),
            Json(serde_json::json!({ "error": message })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::Validation("cannot map a product to itself".to_string());
        assert_eq!(
            err.to_string(),
            "Validation error: cannot map a product to itself"
        );
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::Validation("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Conflict("test".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Upstream(MarketplaceError::Status {
                status: 503,
                body: String::new()
            })),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::Configuration("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Crypto(CryptoError::TooShort(3))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_repository_errors_keep_their_kind() {
        assert!(matches!(
            AppError::from(RepositoryError::NotFound),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(RepositoryError::Conflict("dup".to_string())),
            AppError::Conflict(_)
        ));
        assert!(matches!(
            AppError::from(RepositoryError::DataCorruption("bad".to_string())),
            AppError::Database(_)
        ));
    }

    #[test]
    fn test_marketplace_configuration_is_not_upstream() {
        assert!(matches!(
            AppError::from(MarketplaceError::Configuration("no token".to_string())),
            AppError::Configuration(_)
        ));
        assert!(matches!(
            AppError::from(MarketplaceError::Decode("eof".to_string())),
            AppError::Upstream(_)
        ));
    }
}
