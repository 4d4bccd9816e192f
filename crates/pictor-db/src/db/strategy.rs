//! Strategy repository: CRUD for the storage_strategies table.

use pictor_core::{AppError, StorageStrategy, StrategyKind};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

const STRATEGY_COLUMNS: &str =
    "id, name, kind, config, is_active, is_default, created_at, updated_at";

/// Row type for storage_strategies table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
pub struct StrategyRow {
    pub id: Uuid,
    pub name: String,
    pub kind: StrategyKind,
    pub config: serde_json::Value,
    pub is_active: bool,
    pub is_default: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl StrategyRow {
    pub fn to_strategy(self) -> StorageStrategy {
        StorageStrategy {
            id: self.id,
            name: self.name,
            kind: self.kind,
            config: self.config,
            is_active: self.is_active,
            is_default: self.is_default,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Repository for storage_strategies table.
#[derive(Clone)]
pub struct StrategyRepository {
    pool: PgPool,
}

impl StrategyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new strategy. Making it the default demotes any current one.
    #[tracing::instrument(skip(self, config), fields(db.table = "storage_strategies"))]
    pub async fn create(
        &self,
        name: String,
        kind: StrategyKind,
        config: serde_json::Value,
        is_default: bool,
    ) -> Result<StorageStrategy, AppError> {
        let mut tx = self.pool.begin().await?;
        if is_default {
            sqlx::query("UPDATE storage_strategies SET is_default = FALSE WHERE is_default")
                .execute(&mut *tx)
                .await?;
        }
        let row: StrategyRow = sqlx::query_as::<Postgres, StrategyRow>(&format!(
            r#"
            INSERT INTO storage_strategies (name, kind, config, is_default)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            STRATEGY_COLUMNS
        ))
        .bind(&name)
        .bind(kind)
        .bind(&config)
        .bind(is_default)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(row.to_strategy())
    }

    #[tracing::instrument(skip(self), fields(db.table = "storage_strategies", db.record_id = %id))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<StorageStrategy>, AppError> {
        let row: Option<StrategyRow> = sqlx::query_as::<Postgres, StrategyRow>(&format!(
            "SELECT {} FROM storage_strategies WHERE id = $1",
            STRATEGY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.to_strategy()))
    }

    /// The global default strategy, if one is configured and active.
    #[tracing::instrument(skip(self), fields(db.table = "storage_strategies"))]
    pub async fn get_default(&self) -> Result<Option<StorageStrategy>, AppError> {
        let row: Option<StrategyRow> = sqlx::query_as::<Postgres, StrategyRow>(&format!(
            "SELECT {} FROM storage_strategies WHERE is_default AND is_active",
            STRATEGY_COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.to_strategy()))
    }

    #[tracing::instrument(skip(self), fields(db.table = "storage_strategies"))]
    pub async fn list(&self) -> Result<Vec<StorageStrategy>, AppError> {
        let rows: Vec<StrategyRow> = sqlx::query_as::<Postgres, StrategyRow>(&format!(
            "SELECT {} FROM storage_strategies ORDER BY created_at",
            STRATEGY_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.to_strategy()).collect())
    }

    /// Replace the config blob. Used for credential rotation and for
    /// persisting refreshed OneDrive tokens.
    #[tracing::instrument(skip(self, config), fields(db.table = "storage_strategies", db.record_id = %id))]
    pub async fn update_config(
        &self,
        id: Uuid,
        config: serde_json::Value,
    ) -> Result<StorageStrategy, AppError> {
        let row: Option<StrategyRow> = sqlx::query_as::<Postgres, StrategyRow>(&format!(
            r#"
            UPDATE storage_strategies
            SET config = $2, updated_at = now()
            WHERE id = $1
            RETURNING {}
            "#,
            STRATEGY_COLUMNS
        ))
        .bind(id)
        .bind(&config)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| r.to_strategy())
            .ok_or_else(|| AppError::NotFound(format!("storage strategy {}", id)))
    }

    #[tracing::instrument(skip(self), fields(db.table = "storage_strategies", db.record_id = %id))]
    pub async fn set_active(&self, id: Uuid, is_active: bool) -> Result<(), AppError> {
        let result =
            sqlx::query("UPDATE storage_strategies SET is_active = $2, updated_at = now() WHERE id = $1")
                .bind(id)
                .bind(is_active)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("storage strategy {}", id)));
        }
        Ok(())
    }

    /// Promote one strategy to global default, demoting the previous one in
    /// the same transaction.
    #[tracing::instrument(skip(self), fields(db.table = "storage_strategies", db.record_id = %id))]
    pub async fn set_default(&self, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE storage_strategies SET is_default = FALSE WHERE is_default")
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query(
            "UPDATE storage_strategies SET is_default = TRUE, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("storage strategy {}", id)));
        }
        tx.commit().await?;
        Ok(())
    }

    /// Delete a strategy. Refused while any tenant still holds an active
    /// assignment to it.
    #[tracing::instrument(skip(self), fields(db.table = "storage_strategies", db.record_id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let (active_assignments,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM storage_assignments WHERE strategy_id = $1 AND is_active",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        if active_assignments > 0 {
            return Err(AppError::Conflict(format!(
                "strategy {} still has {} active assignment(s)",
                id, active_assignments
            )));
        }

        let result = sqlx::query("DELETE FROM storage_strategies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("storage strategy {}", id)));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl pictor_services::StrategyStore for StrategyRepository {
    async fn get(&self, id: Uuid) -> Result<Option<StorageStrategy>, AppError> {
        self.get_by_id(id).await
    }

    async fn get_default(&self) -> Result<Option<StorageStrategy>, AppError> {
        StrategyRepository::get_default(self).await
    }
}
