//! Application error types

use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Sync not configured: {0}")]
    NotConfigured(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Remote error ({status}): {message}")]
    Remote { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse failure class seen by the sync client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncErrorKind {
    /// Network failure, non-2xx from the store, undecodable response
    Transient,
    /// The server has no store backend; retrying will not help
    NotConfigured,
    /// The request itself was refused (bad id, bad rows)
    Rejected,
}

impl AppError {
    /// Classify for the sync status indicator
    pub fn kind(&self) -> SyncErrorKind {
        match self {
            AppError::NotConfigured(_) => SyncErrorKind::NotConfigured,
            AppError::Validation(_) => SyncErrorKind::Rejected,
            _ => SyncErrorKind::Transient,
        }
    }

    /// HTTP status used when this error ends a server request
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotConfigured(_) => StatusCode::NOT_IMPLEMENTED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_classification() {
        assert_eq!(
            AppError::NotConfigured("no backend".into()).kind(),
            SyncErrorKind::NotConfigured
        );
        assert_eq!(AppError::Validation("bad id".into()).kind(), SyncErrorKind::Rejected);
        assert_eq!(AppError::Store("timeout".into()).kind(), SyncErrorKind::Transient);
        assert_eq!(
            AppError::Remote { status: 502, message: "bad gateway".into() }.kind(),
            SyncErrorKind::Transient
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::Validation("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotConfigured("x".into()).status_code(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(AppError::Store("x".into()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
