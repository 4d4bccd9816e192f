//! Storage abstraction trait
//!
//! This module defines the `ObjectStore` trait that all storage backends implement,
//! along with the storage error taxonomy. The contract is four operations: store a
//! blob, remove a blob by path, resolve a retrieval URL, and report usage.

use async_trait::async_trait;
use bytes::Bytes;
use pictor_core::StrategyKind;
use thiserror::Error;

/// Storage operation errors
///
/// `Transport` carries a retryability flag: the backend decides whether a failure
/// is worth retrying (a 5xx from an object-storage endpoint is, a 4xx is not).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport failure ({status:?}): {message}")]
    Transport {
        status: Option<u16>,
        message: String,
        retryable: bool,
    },

    #[error("Authorization expired: {0}")]
    AuthExpired(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Build a transport error from an HTTP status, classifying retryability.
    /// 5xx and 429 are retryable; other client errors are not.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        StoreError::Transport {
            status: Some(status),
            message: message.into(),
            retryable: status >= 500 || status == 429,
        }
    }

    /// Network-level failure with no HTTP status (connect/timeout). Retryable.
    pub fn network(message: impl Into<String>) -> Self {
        StoreError::Transport {
            status: None,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Transport { retryable: true, .. })
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::network(err.to_string())
    }
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// The outcome of a successful store operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Retrieval path under the owning strategy.
    pub path: String,
    /// Bytes transferred.
    pub size: u64,
}

/// Best-effort usage report.
///
/// Backends without a usage API return [`StorageUsage::unknown`]; callers must
/// treat the zero sentinel as "unknown", not "empty".
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct StorageUsage {
    pub used: u64,
    pub total: u64,
    pub percentage: f64,
}

impl StorageUsage {
    pub fn new(used: u64, total: u64) -> Self {
        let percentage = if total > 0 {
            used as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        StorageUsage {
            used,
            total,
            percentage,
        }
    }

    /// Zero sentinel for backends with no usage API.
    pub fn unknown() -> Self {
        StorageUsage {
            used: 0,
            total: 0,
            percentage: 0.0,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.used == 0 && self.total == 0
    }
}

/// Storage abstraction trait
///
/// All six backends implement this. Paths are produced by the central path
/// policy (`paths` module) and validated against traversal before use; blobs
/// reaching a backend have already passed the central type/size policy.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store a blob under the suggested path. Returns the retrieval path and
    /// the byte count actually transferred.
    async fn store(&self, path: &str, content_type: &str, data: Bytes)
        -> StoreResult<StoredObject>;

    /// Remove a blob by path. Idempotent: deleting an already-absent object
    /// succeeds, since the goal is "ensure it is gone".
    async fn delete(&self, path: &str) -> StoreResult<()>;

    /// Resolve the public retrieval URL for a path. Pure for backends with
    /// static URLs; may require an authenticated round trip (OneDrive).
    async fn resolve_url(&self, path: &str) -> StoreResult<String>;

    /// Report usage. Best-effort; zero sentinel means unknown.
    async fn usage(&self) -> StoreResult<StorageUsage>;

    /// The backend kind this store implements.
    fn kind(&self) -> StrategyKind;
}
