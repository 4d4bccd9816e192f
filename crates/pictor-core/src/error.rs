//! Error types module
//!
//! This module provides the core error types used throughout the Pictor application.
//! All errors are unified under the `AppError` enum which can represent database,
//! storage, validation, and quota errors.
//!
//! Every variant carries a distinct, stable machine-readable code so callers can
//! make retry-vs-abandon decisions without parsing free-text messages.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like quota limits
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their HTTP response characteristics
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "QUOTA_EXCEEDED")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Quota exceeded: {used} used + {requested} requested exceeds limit of {limit} bytes")]
    QuotaExceeded {
        used: i64,
        limit: i64,
        requested: i64,
    },

    #[error("Storage backend '{backend}' failed: {message}")]
    Backend {
        backend: String,
        message: String,
        retryable: bool,
    },

    #[error("Authorization expired: {0}")]
    AuthExpired(String),

    #[error("No storage available for tenant")]
    NoStorageAvailable,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::Validation(format!("UUID parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
/// Reduces duplication in ErrorMetadata impl; client_message stays per-variant for dynamic content.
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Validation(_) => (
            400,
            "VALIDATION_ERROR",
            false,
            Some("Check file type and size and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::QuotaExceeded { .. } => (
            413,
            "QUOTA_EXCEEDED",
            false,
            Some("Free space or request a quota increase"),
            false,
            LogLevel::Warn,
        ),
        AppError::Backend { retryable, .. } => (
            502,
            "BACKEND_ERROR",
            *retryable,
            Some("Retry after a short delay if the error is retryable"),
            true,
            LogLevel::Error,
        ),
        AppError::AuthExpired(_) => (
            401,
            "AUTH_EXPIRED",
            false,
            Some("Re-run the storage authorization flow"),
            false,
            LogLevel::Warn,
        ),
        AppError::NoStorageAvailable => (
            409,
            "NO_STORAGE_AVAILABLE",
            false,
            Some("Ask an administrator to assign a storage strategy"),
            false,
            LogLevel::Warn,
        ),
        AppError::Conflict(_) => (
            409,
            "CONFLICT",
            false,
            Some("Re-read the current object state and retry the operation"),
            false,
            LogLevel::Warn,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::Internal(_) => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Validation(ref msg) => msg.clone(),
            AppError::QuotaExceeded {
                used,
                limit,
                requested,
            } => format!(
                "Storage quota exceeded: {} bytes used, {} requested, limit {}",
                used, requested, limit
            ),
            AppError::Backend { backend, .. } => {
                format!("Storage backend '{}' is unavailable", backend)
            }
            AppError::AuthExpired(ref msg) => msg.clone(),
            AppError::NoStorageAvailable => {
                "No storage backend is assigned to this account".to_string()
            }
            AppError::Conflict(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_quota_exceeded() {
        let err = AppError::QuotaExceeded {
            used: 90,
            limit: 100,
            requested: 20,
        };
        assert_eq!(err.http_status_code(), 413);
        assert_eq!(err.error_code(), "QUOTA_EXCEEDED");
        assert!(!err.is_recoverable());
        assert!(err.client_message().contains("90"));
        assert!(err.client_message().contains("100"));
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_error_metadata_backend_retryable_flag() {
        let retryable = AppError::Backend {
            backend: "s3".to_string(),
            message: "503 slow down".to_string(),
            retryable: true,
        };
        assert!(retryable.is_recoverable());
        assert_eq!(retryable.error_code(), "BACKEND_ERROR");

        let terminal = AppError::Backend {
            backend: "s3".to_string(),
            message: "403 forbidden".to_string(),
            retryable: false,
        };
        assert!(!terminal.is_recoverable());
    }

    #[test]
    fn test_error_metadata_no_storage_available() {
        let err = AppError::NoStorageAvailable;
        assert_eq!(err.http_status_code(), 409);
        assert_eq!(err.error_code(), "NO_STORAGE_AVAILABLE");
        assert!(!err.is_recoverable());
        assert!(!err.is_sensitive());
    }

    #[test]
    fn test_error_codes_are_distinct() {
        let errors = [
            AppError::Validation("x".into()),
            AppError::QuotaExceeded {
                used: 0,
                limit: 0,
                requested: 0,
            },
            AppError::Backend {
                backend: "s3".into(),
                message: "x".into(),
                retryable: false,
            },
            AppError::AuthExpired("x".into()),
            AppError::NoStorageAvailable,
            AppError::Conflict("x".into()),
            AppError::NotFound("x".into()),
            AppError::Internal("x".into()),
        ];
        let mut codes: Vec<&str> = errors.iter().map(|e| e.error_code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }
}
