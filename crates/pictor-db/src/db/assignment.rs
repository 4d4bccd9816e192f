//! Assignment repository: tenant-to-strategy grants.
//!
//! Default handling is transactional throughout: a tenant never observes two
//! defaults, and revoking the default promotes the oldest remaining active
//! assignment.

use pictor_core::{AppError, StorageAssignment};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

const ASSIGNMENT_COLUMNS: &str =
    "id, tenant_id, strategy_id, quota_bytes, is_default, is_active, created_at";

/// Row type for storage_assignments table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
pub struct AssignmentRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub strategy_id: Uuid,
    pub quota_bytes: Option<i64>,
    pub is_default: bool,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl AssignmentRow {
    pub fn to_assignment(self) -> StorageAssignment {
        StorageAssignment {
            id: self.id,
            tenant_id: self.tenant_id,
            strategy_id: self.strategy_id,
            quota_bytes: self.quota_bytes,
            is_default: self.is_default,
            is_active: self.is_active,
            created_at: self.created_at,
        }
    }
}

/// Repository for storage_assignments table.
#[derive(Clone)]
pub struct AssignmentRepository {
    pool: PgPool,
}

impl AssignmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn clear_default_tx(
        tx: &mut Transaction<'_, Postgres>,
        tenant_id: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE storage_assignments SET is_default = FALSE WHERE tenant_id = $1 AND is_default",
        )
        .bind(tenant_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Grant a strategy to a tenant. Re-granting a revoked assignment
    /// reactivates it with the new quota.
    #[tracing::instrument(skip(self), fields(db.table = "storage_assignments", tenant_id = %tenant_id))]
    pub async fn grant(
        &self,
        tenant_id: Uuid,
        strategy_id: Uuid,
        quota_bytes: Option<i64>,
        is_default: bool,
    ) -> Result<StorageAssignment, AppError> {
        let mut tx = self.pool.begin().await?;
        if is_default {
            Self::clear_default_tx(&mut tx, tenant_id).await?;
        }
        let row: AssignmentRow = sqlx::query_as::<Postgres, AssignmentRow>(&format!(
            r#"
            INSERT INTO storage_assignments (tenant_id, strategy_id, quota_bytes, is_default)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (tenant_id, strategy_id) DO UPDATE
                SET is_active = TRUE,
                    quota_bytes = EXCLUDED.quota_bytes,
                    is_default = EXCLUDED.is_default
            RETURNING {}
            "#,
            ASSIGNMENT_COLUMNS
        ))
        .bind(tenant_id)
        .bind(strategy_id)
        .bind(quota_bytes)
        .bind(is_default)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(row.to_assignment())
    }

    #[tracing::instrument(skip(self), fields(db.table = "storage_assignments", tenant_id = %tenant_id))]
    pub async fn find(
        &self,
        tenant_id: Uuid,
        strategy_id: Uuid,
    ) -> Result<Option<StorageAssignment>, AppError> {
        let row: Option<AssignmentRow> = sqlx::query_as::<Postgres, AssignmentRow>(&format!(
            "SELECT {} FROM storage_assignments WHERE tenant_id = $1 AND strategy_id = $2",
            ASSIGNMENT_COLUMNS
        ))
        .bind(tenant_id)
        .bind(strategy_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.to_assignment()))
    }

    #[tracing::instrument(skip(self), fields(db.table = "storage_assignments", tenant_id = %tenant_id))]
    pub async fn find_default(
        &self,
        tenant_id: Uuid,
    ) -> Result<Option<StorageAssignment>, AppError> {
        let row: Option<AssignmentRow> = sqlx::query_as::<Postgres, AssignmentRow>(&format!(
            "SELECT {} FROM storage_assignments WHERE tenant_id = $1 AND is_default",
            ASSIGNMENT_COLUMNS
        ))
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.to_assignment()))
    }

    #[tracing::instrument(skip(self), fields(db.table = "storage_assignments", tenant_id = %tenant_id))]
    pub async fn list_for_tenant(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<StorageAssignment>, AppError> {
        let rows: Vec<AssignmentRow> = sqlx::query_as::<Postgres, AssignmentRow>(&format!(
            "SELECT {} FROM storage_assignments WHERE tenant_id = $1 ORDER BY created_at",
            ASSIGNMENT_COLUMNS
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.to_assignment()).collect())
    }

    /// Make one assignment the tenant default.
    #[tracing::instrument(skip(self), fields(db.table = "storage_assignments", tenant_id = %tenant_id))]
    pub async fn set_default(&self, tenant_id: Uuid, strategy_id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        Self::clear_default_tx(&mut tx, tenant_id).await?;
        let result = sqlx::query(
            r#"
            UPDATE storage_assignments SET is_default = TRUE
            WHERE tenant_id = $1 AND strategy_id = $2 AND is_active
            "#,
        )
        .bind(tenant_id)
        .bind(strategy_id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "active assignment of strategy {} for tenant {}",
                strategy_id, tenant_id
            )));
        }
        tx.commit().await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "storage_assignments", tenant_id = %tenant_id))]
    pub async fn set_quota(
        &self,
        tenant_id: Uuid,
        strategy_id: Uuid,
        quota_bytes: Option<i64>,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE storage_assignments SET quota_bytes = $3 WHERE tenant_id = $1 AND strategy_id = $2",
        )
        .bind(tenant_id)
        .bind(strategy_id)
        .bind(quota_bytes)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "assignment of strategy {} for tenant {}",
                strategy_id, tenant_id
            )));
        }
        Ok(())
    }

    /// Deactivate an assignment. If it was the tenant default, the oldest
    /// remaining active assignment is promoted; with none left the tenant has
    /// no default and uploads fail until re-granted.
    #[tracing::instrument(skip(self), fields(db.table = "storage_assignments", tenant_id = %tenant_id))]
    pub async fn revoke(&self, tenant_id: Uuid, strategy_id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        let was_default: Option<(bool,)> = sqlx::query_as(
            r#"
            SELECT is_default FROM storage_assignments
            WHERE tenant_id = $1 AND strategy_id = $2 AND is_active
            FOR UPDATE
            "#,
        )
        .bind(tenant_id)
        .bind(strategy_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((was_default,)) = was_default else {
            return Err(AppError::NotFound(format!(
                "active assignment of strategy {} for tenant {}",
                strategy_id, tenant_id
            )));
        };

        sqlx::query(
            r#"
            UPDATE storage_assignments
            SET is_active = FALSE, is_default = FALSE
            WHERE tenant_id = $1 AND strategy_id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(strategy_id)
        .execute(&mut *tx)
        .await?;

        if was_default {
            sqlx::query(
                r#"
                UPDATE storage_assignments SET is_default = TRUE
                WHERE id = (
                    SELECT id FROM storage_assignments
                    WHERE tenant_id = $1 AND is_active
                    ORDER BY created_at
                    LIMIT 1
                )
                "#,
            )
            .bind(tenant_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl pictor_services::AssignmentStore for AssignmentRepository {
    async fn find(
        &self,
        tenant_id: Uuid,
        strategy_id: Uuid,
    ) -> Result<Option<StorageAssignment>, AppError> {
        AssignmentRepository::find(self, tenant_id, strategy_id).await
    }

    async fn find_default(&self, tenant_id: Uuid) -> Result<Option<StorageAssignment>, AppError> {
        AssignmentRepository::find_default(self, tenant_id).await
    }

    async fn list_for_tenant(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<StorageAssignment>, AppError> {
        AssignmentRepository::list_for_tenant(self, tenant_id).await
    }

    async fn grant(
        &self,
        tenant_id: Uuid,
        strategy_id: Uuid,
        quota_bytes: Option<i64>,
        is_default: bool,
    ) -> Result<StorageAssignment, AppError> {
        AssignmentRepository::grant(self, tenant_id, strategy_id, quota_bytes, is_default).await
    }
}
