use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use pictor_core::models::LocalConfig;
use pictor_core::StrategyKind;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::paths::validate_path;
use crate::traits::{ObjectStore, StorageUsage, StoreError, StoreResult, StoredObject};

/// Local disk capacity ceiling used for usage percentage reporting.
const LOCAL_CAPACITY_BYTES: u64 = 10 * 1024 * 1024 * 1024;

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStore {
    root: PathBuf,
    base_url: String,
}

impl LocalStore {
    /// Create a new LocalStore, creating the root directory if needed.
    pub async fn new(config: &LocalConfig) -> StoreResult<Self> {
        let root = PathBuf::from(&config.root);

        fs::create_dir_all(&root).await.map_err(|e| {
            StoreError::Config(format!(
                "Failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(LocalStore {
            root,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Convert a storage path to a filesystem path with traversal validation.
    fn fs_path(&self, path: &str) -> StoreResult<PathBuf> {
        validate_path(path)?;
        Ok(self.root.join(path))
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn store(
        &self,
        path: &str,
        _content_type: &str,
        data: Bytes,
    ) -> StoreResult<StoredObject> {
        let fs_path = self.fs_path(path)?;
        let size = data.len() as u64;

        self.ensure_parent_dir(&fs_path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&fs_path).await.map_err(|e| {
            StoreError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to create file {}: {}", fs_path.display(), e),
            ))
        })?;

        file.write_all(&data).await?;
        file.sync_all().await?;

        tracing::info!(
            path = %fs_path.display(),
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(StoredObject {
            path: path.to_string(),
            size,
        })
    }

    async fn delete(&self, path: &str) -> StoreResult<()> {
        let fs_path = self.fs_path(path)?;

        if !fs::try_exists(&fs_path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&fs_path).await?;

        tracing::info!(path = %fs_path.display(), "Local storage delete successful");

        Ok(())
    }

    async fn resolve_url(&self, path: &str) -> StoreResult<String> {
        validate_path(path)?;
        Ok(self.public_url(path))
    }

    /// Usage via a directory walk; bounded by local disk, not network latency.
    async fn usage(&self) -> StoreResult<StorageUsage> {
        let mut used: u64 = 0;
        let mut stack = vec![self.root.clone()];

        while let Some(dir) = stack.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(_) => continue,
            };
            while let Ok(Some(entry)) = entries.next_entry().await {
                let meta = match entry.metadata().await {
                    Ok(meta) => meta,
                    Err(_) => continue,
                };
                if meta.is_dir() {
                    stack.push(entry.path());
                } else {
                    used += meta.len();
                }
            }
        }

        Ok(StorageUsage::new(used, LOCAL_CAPACITY_BYTES))
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Local
    }
}
