//! Backend instantiation seam and storage error mapping.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pictor_core::{AppError, StorageStrategy};
use pictor_storage::{ObjectStore, StoreError};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Builds a live backend for a strategy. A seam rather than a direct call so
/// tests can substitute instrumented backends.
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    async fn provider_for(
        &self,
        strategy: &StorageStrategy,
    ) -> Result<Arc<dyn ObjectStore>, AppError>;
}

/// Production factory delegating to the storage crate.
///
/// Providers are cached per strategy, keyed by `updated_at` so a config edit
/// rebuilds them. The cache keeps stateful backends (OneDrive token state)
/// alive across operations.
#[derive(Default)]
pub struct LiveProviderFactory {
    cache: Mutex<HashMap<Uuid, (DateTime<Utc>, Arc<dyn ObjectStore>)>>,
}

#[async_trait]
impl ProviderFactory for LiveProviderFactory {
    async fn provider_for(
        &self,
        strategy: &StorageStrategy,
    ) -> Result<Arc<dyn ObjectStore>, AppError> {
        let mut cache = self.cache.lock().await;
        if let Some((built_at, provider)) = cache.get(&strategy.id) {
            if *built_at == strategy.updated_at {
                return Ok(provider.clone());
            }
        }

        let provider = pictor_storage::provider_for(strategy)
            .await
            .map_err(|e| map_store_error(&strategy.kind.to_string(), e))?;
        cache.insert(strategy.id, (strategy.updated_at, provider.clone()));
        Ok(provider)
    }
}

/// Translate a backend failure into the application error taxonomy.
pub fn map_store_error(backend: &str, err: StoreError) -> AppError {
    match err {
        StoreError::Config(msg) => AppError::Validation(format!(
            "storage strategy misconfigured: {}",
            msg
        )),
        StoreError::Transport {
            message, retryable, ..
        } => AppError::Backend {
            backend: backend.to_string(),
            message,
            retryable,
        },
        StoreError::AuthExpired(msg) => AppError::AuthExpired(msg),
        StoreError::Conflict(msg) => AppError::Conflict(msg),
        StoreError::InvalidPath(msg) => AppError::Internal(format!("invalid storage path: {}", msg)),
        StoreError::Io(err) => AppError::Backend {
            backend: backend.to_string(),
            message: err.to_string(),
            retryable: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pictor_core::ErrorMetadata;

    #[test]
    fn test_transport_maps_to_backend_error() {
        let err = map_store_error("s3", StoreError::from_status(503, "unavailable"));
        assert_eq!(err.error_code(), "BACKEND_ERROR");
        assert!(err.is_recoverable());

        let err = map_store_error("s3", StoreError::from_status(403, "forbidden"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_auth_expired_maps_through() {
        let err = map_store_error("onedrive", StoreError::AuthExpired("expired".into()));
        assert_eq!(err.error_code(), "AUTH_EXPIRED");
    }
}
