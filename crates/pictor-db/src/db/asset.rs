//! Asset repository.
//!
//! The dedup invariant lives here: a unique index on `(tenant_id, digest)`
//! plus insert-or-refetch makes concurrent identical uploads converge on one
//! surviving row without application-level locking.

use pictor_core::{AppError, Asset};
use pictor_services::NewAsset;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

const ASSET_COLUMNS: &str = "id, tenant_id, strategy_id, digest, share_id, path, size, \
                             width, height, content_type, extension, is_public, created_at";

/// Row type for assets table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
pub struct AssetRow {
    pub id: Uuid,
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
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl AssetRow {
    pub fn to_asset(self) -> Asset {
        Asset {
            id: self.id,
            tenant_id: self.tenant_id,
            strategy_id: self.strategy_id,
            digest: self.digest,
            share_id: self.share_id,
            path: self.path,
            size: self.size,
            width: self.width,
            height: self.height,
            content_type: self.content_type,
            extension: self.extension,
            is_public: self.is_public,
            created_at: self.created_at,
        }
    }
}

/// Repository for assets table.
#[derive(Clone)]
pub struct AssetRepository {
    pool: PgPool,
}

impl AssetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert unless the tenant already holds these bytes. Returns the
    /// surviving row and whether this call created it.
    #[tracing::instrument(
        skip(self, new_asset),
        fields(db.table = "assets", tenant_id = %new_asset.tenant_id, digest = %new_asset.digest)
    )]
    pub async fn insert_if_absent(&self, new_asset: NewAsset) -> Result<(Asset, bool), AppError> {
        let inserted: Option<AssetRow> = sqlx::query_as::<Postgres, AssetRow>(&format!(
            r#"
            INSERT INTO assets
                (tenant_id, strategy_id, digest, share_id, path, size,
                 width, height, content_type, extension, is_public)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (tenant_id, digest) DO NOTHING
            RETURNING {}
            "#,
            ASSET_COLUMNS
        ))
        .bind(new_asset.tenant_id)
        .bind(new_asset.strategy_id)
        .bind(&new_asset.digest)
        .bind(&new_asset.share_id)
        .bind(&new_asset.path)
        .bind(new_asset.size)
        .bind(new_asset.width)
        .bind(new_asset.height)
        .bind(&new_asset.content_type)
        .bind(&new_asset.extension)
        .bind(new_asset.is_public)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            return Ok((row.to_asset(), true));
        }

        // Lost the insert race; the winner's row must exist.
        let existing = self
            .find_by_tenant_and_digest(new_asset.tenant_id, &new_asset.digest)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "asset insert conflicted but no row found for tenant {} digest {}",
                    new_asset.tenant_id, new_asset.digest
                ))
            })?;
        Ok((existing, false))
    }

    #[tracing::instrument(skip(self), fields(db.table = "assets", tenant_id = %tenant_id))]
    pub async fn find_by_tenant_and_digest(
        &self,
        tenant_id: Uuid,
        digest: &str,
    ) -> Result<Option<Asset>, AppError> {
        let row: Option<AssetRow> = sqlx::query_as::<Postgres, AssetRow>(&format!(
            "SELECT {} FROM assets WHERE tenant_id = $1 AND digest = $2",
            ASSET_COLUMNS
        ))
        .bind(tenant_id)
        .bind(digest)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.to_asset()))
    }

    #[tracing::instrument(skip(self), fields(db.table = "assets", share_id = %share_id))]
    pub async fn find_by_share_id(&self, share_id: &str) -> Result<Option<Asset>, AppError> {
        let row: Option<AssetRow> = sqlx::query_as::<Postgres, AssetRow>(&format!(
            "SELECT {} FROM assets WHERE share_id = $1",
            ASSET_COLUMNS
        ))
        .bind(share_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.to_asset()))
    }

    #[tracing::instrument(skip(self), fields(db.table = "assets", db.record_id = %id))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Asset>, AppError> {
        let row: Option<AssetRow> = sqlx::query_as::<Postgres, AssetRow>(&format!(
            "SELECT {} FROM assets WHERE id = $1",
            ASSET_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.to_asset()))
    }

    #[tracing::instrument(skip(self), fields(db.table = "assets", tenant_id = %tenant_id))]
    pub async fn list_for_tenant(&self, tenant_id: Uuid) -> Result<Vec<Asset>, AppError> {
        let rows: Vec<AssetRow> = sqlx::query_as::<Postgres, AssetRow>(&format!(
            "SELECT {} FROM assets WHERE tenant_id = $1 ORDER BY created_at DESC",
            ASSET_COLUMNS
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.to_asset()).collect())
    }

    #[tracing::instrument(skip(self), fields(db.table = "assets", db.record_id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM assets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Total stored bytes for a tenant on one strategy.
    #[tracing::instrument(skip(self), fields(db.table = "assets", tenant_id = %tenant_id))]
    pub async fn sum_size(&self, tenant_id: Uuid, strategy_id: Uuid) -> Result<i64, AppError> {
        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(size), 0)::BIGINT
            FROM assets
            WHERE tenant_id = $1 AND strategy_id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(strategy_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    /// Total stored bytes for a tenant across every strategy.
    #[tracing::instrument(skip(self), fields(db.table = "assets", tenant_id = %tenant_id))]
    pub async fn sum_size_for_tenant(&self, tenant_id: Uuid) -> Result<i64, AppError> {
        let (total,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(size), 0)::BIGINT FROM assets WHERE tenant_id = $1",
        )
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }
}

#[async_trait::async_trait]
impl pictor_services::AssetStore for AssetRepository {
    async fn insert_if_absent(&self, new_asset: NewAsset) -> Result<(Asset, bool), AppError> {
        AssetRepository::insert_if_absent(self, new_asset).await
    }

    async fn find_by_tenant_and_digest(
        &self,
        tenant_id: Uuid,
        digest: &str,
    ) -> Result<Option<Asset>, AppError> {
        AssetRepository::find_by_tenant_and_digest(self, tenant_id, digest).await
    }

    async fn find_by_share_id(&self, share_id: &str) -> Result<Option<Asset>, AppError> {
        AssetRepository::find_by_share_id(self, share_id).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<Asset>, AppError> {
        self.get_by_id(id).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        AssetRepository::delete(self, id).await
    }

    async fn sum_size(&self, tenant_id: Uuid, strategy_id: Uuid) -> Result<i64, AppError> {
        AssetRepository::sum_size(self, tenant_id, strategy_id).await
    }

    async fn total_size(&self, tenant_id: Uuid) -> Result<i64, AppError> {
        self.sum_size_for_tenant(tenant_id).await
    }
}
