//! In-memory fakes for pipeline tests: persistence stores backed by mutexed
//! maps and a counting backend that records every object operation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use pictor_core::{AppError, Asset, StorageAssignment, StorageStrategy, StrategyKind};
use pictor_services::{AssetStore, AssignmentStore, NewAsset, ProviderFactory, StrategyStore};
use pictor_storage::{ObjectStore, StorageUsage, StoreError, StoreResult, StoredObject};
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryStrategies {
    rows: Mutex<HashMap<Uuid, StorageStrategy>>,
}

impl InMemoryStrategies {
    pub fn add(&self, strategy: StorageStrategy) {
        self.rows.lock().unwrap().insert(strategy.id, strategy);
    }
}

#[async_trait]
impl StrategyStore for InMemoryStrategies {
    async fn get(&self, id: Uuid) -> Result<Option<StorageStrategy>, AppError> {
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn get_default(&self) -> Result<Option<StorageStrategy>, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .find(|s| s.is_default && s.is_active)
            .cloned())
    }
}

#[derive(Default)]
pub struct InMemoryAssignments {
    rows: Mutex<Vec<StorageAssignment>>,
}

impl InMemoryAssignments {
    pub fn add(&self, assignment: StorageAssignment) {
        self.rows.lock().unwrap().push(assignment);
    }

    pub fn count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl AssignmentStore for InMemoryAssignments {
    async fn find(
        &self,
        tenant_id: Uuid,
        strategy_id: Uuid,
    ) -> Result<Option<StorageAssignment>, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.tenant_id == tenant_id && a.strategy_id == strategy_id)
            .cloned())
    }

    async fn find_default(&self, tenant_id: Uuid) -> Result<Option<StorageAssignment>, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.tenant_id == tenant_id && a.is_default)
            .cloned())
    }

    async fn list_for_tenant(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<StorageAssignment>, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn grant(
        &self,
        tenant_id: Uuid,
        strategy_id: Uuid,
        quota_bytes: Option<i64>,
        is_default: bool,
    ) -> Result<StorageAssignment, AppError> {
        let assignment = StorageAssignment {
            id: Uuid::new_v4(),
            tenant_id,
            strategy_id,
            quota_bytes,
            is_default,
            is_active: true,
            created_at: Utc::now(),
        };
        self.rows.lock().unwrap().push(assignment.clone());
        Ok(assignment)
    }
}

#[derive(Default)]
pub struct InMemoryAssets {
    rows: Mutex<Vec<Asset>>,
}

impl InMemoryAssets {
    pub fn count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl AssetStore for InMemoryAssets {
    async fn insert_if_absent(&self, new_asset: NewAsset) -> Result<(Asset, bool), AppError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(existing) = rows
            .iter()
            .find(|a| a.tenant_id == new_asset.tenant_id && a.digest == new_asset.digest)
        {
            return Ok((existing.clone(), false));
        }
        let asset = Asset {
            id: Uuid::new_v4(),
            tenant_id: new_asset.tenant_id,
            strategy_id: new_asset.strategy_id,
            digest: new_asset.digest,
            share_id: new_asset.share_id,
            path: new_asset.path,
            size: new_asset.size,
            width: new_asset.width,
            height: new_asset.height,
            content_type: new_asset.content_type,
            extension: new_asset.extension,
            is_public: new_asset.is_public,
            created_at: Utc::now(),
        };
        rows.push(asset.clone());
        Ok((asset, true))
    }

    async fn find_by_tenant_and_digest(
        &self,
        tenant_id: Uuid,
        digest: &str,
    ) -> Result<Option<Asset>, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.tenant_id == tenant_id && a.digest == digest)
            .cloned())
    }

    async fn find_by_share_id(&self, share_id: &str) -> Result<Option<Asset>, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.share_id == share_id)
            .cloned())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Asset>, AppError> {
        Ok(self.rows.lock().unwrap().iter().find(|a| a.id == id).cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.rows.lock().unwrap().retain(|a| a.id != id);
        Ok(())
    }

    async fn sum_size(&self, tenant_id: Uuid, strategy_id: Uuid) -> Result<i64, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.tenant_id == tenant_id && a.strategy_id == strategy_id)
            .map(|a| a.size)
            .sum())
    }

    async fn total_size(&self, tenant_id: Uuid) -> Result<i64, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.tenant_id == tenant_id)
            .map(|a| a.size)
            .sum())
    }
}

/// Backend fake that counts operations and optionally fails the first N
/// stores with a configurable status.
pub struct CountingStore {
    pub stores: AtomicU32,
    pub deletes: AtomicU32,
    fail_remaining: AtomicU32,
    fail_status: u16,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::failing(0, 0)
    }

    pub fn failing(times: u32, status: u16) -> Self {
        CountingStore {
            stores: AtomicU32::new(0),
            deletes: AtomicU32::new(0),
            fail_remaining: AtomicU32::new(times),
            fail_status: status,
        }
    }

    pub fn store_count(&self) -> u32 {
        self.stores.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> u32 {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for CountingStore {
    async fn store(
        &self,
        path: &str,
        _content_type: &str,
        data: Bytes,
    ) -> StoreResult<StoredObject> {
        self.stores.fetch_add(1, Ordering::SeqCst);
        if self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::from_status(self.fail_status, "injected failure"));
        }
        Ok(StoredObject {
            path: path.to_string(),
            size: data.len() as u64,
        })
    }

    async fn delete(&self, _path: &str) -> StoreResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn resolve_url(&self, path: &str) -> StoreResult<String> {
        Ok(format!("https://cdn.test/{}", path))
    }

    async fn usage(&self) -> StoreResult<StorageUsage> {
        Ok(StorageUsage::unknown())
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::S3
    }
}

/// Factory that hands out one fixed backend for every strategy.
pub struct FixedFactory {
    pub provider: Arc<CountingStore>,
}

#[async_trait]
impl ProviderFactory for FixedFactory {
    async fn provider_for(
        &self,
        _strategy: &StorageStrategy,
    ) -> Result<Arc<dyn ObjectStore>, AppError> {
        Ok(self.provider.clone())
    }
}

pub fn make_strategy(kind: StrategyKind, is_default: bool) -> StorageStrategy {
    StorageStrategy {
        id: Uuid::new_v4(),
        name: format!("{}-test", kind),
        kind,
        config: serde_json::json!({}),
        is_active: true,
        is_default,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn make_assignment(
    tenant_id: Uuid,
    strategy_id: Uuid,
    quota_bytes: Option<i64>,
) -> StorageAssignment {
    StorageAssignment {
        id: Uuid::new_v4(),
        tenant_id,
        strategy_id,
        quota_bytes,
        is_default: true,
        is_active: true,
        created_at: Utc::now(),
    }
}
