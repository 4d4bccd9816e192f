//! Persistence seams.
//!
//! The pipeline talks to storage rows through these traits so the database
//! crate stays swappable and tests can run against in-memory fakes.

use async_trait::async_trait;
use pictor_core::{AppError, Asset, StorageAssignment, StorageStrategy};
use uuid::Uuid;

/// Insert payload for a new asset row.
#[derive(Debug, Clone)]
pub struct NewAsset {
    pub tenant_id: Uuid,
    pub strategy_id: Uuid,
    pub digest: String,
    pub share_id: String,
    pub path: String,
    pub size: i64,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub content_type: String,
    pub extension: String,
    pub is_public: bool,
}

/// Read access to configured storage strategies.
#[async_trait]
pub trait StrategyStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<StorageStrategy>, AppError>;

    /// The global default strategy, if one is configured and active.
    async fn get_default(&self) -> Result<Option<StorageStrategy>, AppError>;
}

/// Tenant-to-strategy assignments.
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    async fn find(
        &self,
        tenant_id: Uuid,
        strategy_id: Uuid,
    ) -> Result<Option<StorageAssignment>, AppError>;

    /// The tenant's default assignment, if any is active.
    async fn find_default(&self, tenant_id: Uuid) -> Result<Option<StorageAssignment>, AppError>;

    async fn list_for_tenant(&self, tenant_id: Uuid)
        -> Result<Vec<StorageAssignment>, AppError>;

    async fn grant(
        &self,
        tenant_id: Uuid,
        strategy_id: Uuid,
        quota_bytes: Option<i64>,
        is_default: bool,
    ) -> Result<StorageAssignment, AppError>;
}

/// Asset rows.
///
/// `insert_if_absent` is the dedup point: implementations must guarantee at
/// most one row per `(tenant_id, digest)` even under concurrent inserts, and
/// return the surviving row together with whether this call created it.
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn insert_if_absent(&self, new_asset: NewAsset) -> Result<(Asset, bool), AppError>;

    async fn find_by_tenant_and_digest(
        &self,
        tenant_id: Uuid,
        digest: &str,
    ) -> Result<Option<Asset>, AppError>;

    async fn find_by_share_id(&self, share_id: &str) -> Result<Option<Asset>, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<Asset>, AppError>;

    async fn delete(&self, id: Uuid) -> Result<(), AppError>;

    /// Total stored bytes for a tenant on one strategy.
    async fn sum_size(&self, tenant_id: Uuid, strategy_id: Uuid) -> Result<i64, AppError>;

    /// Total stored bytes for a tenant across every strategy. Quota
    /// enforcement uses this tenant-wide figure, not the per-strategy one.
    async fn total_size(&self, tenant_id: Uuid) -> Result<i64, AppError>;
}
