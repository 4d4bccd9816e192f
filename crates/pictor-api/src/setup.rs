//! Application wiring: database, seed data, services, router.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use pictor_core::models::LocalConfig;
use pictor_core::validation::UploadPolicy;
use pictor_core::{AppConfig, StrategyKind};
use pictor_db::{AssetRepository, AssignmentRepository, StrategyRepository};
use pictor_services::{LiveProviderFactory, StorageService};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::routes::build_router;
use crate::state::{AppState, SharedState};

/// Setup database connection pool and run migrations
pub async fn setup_database(config: &AppConfig) -> anyhow::Result<PgPool> {
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.database_url)
        .await?;

    tracing::info!(
        max_connections = config.db_max_connections,
        "Database connected successfully"
    );

    let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../migrations");
    let migrator = sqlx::migrate::Migrator::new(migrations_dir)
        .await
        .context("Failed to load migrations")?;
    migrator
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}

/// Seed a default local strategy on an empty installation so the service is
/// usable before an administrator configures anything.
async fn seed_local_strategy(
    strategies: &StrategyRepository,
    config: &AppConfig,
) -> anyhow::Result<()> {
    if !strategies.list().await?.is_empty() {
        return Ok(());
    }
    let local = LocalConfig {
        root: config.local_storage_path.clone(),
        base_url: config.local_storage_base_url.clone(),
    };
    let strategy = strategies
        .create(
            "local".to_string(),
            StrategyKind::Local,
            serde_json::to_value(&local)?,
            true,
        )
        .await?;
    tracing::info!(
        strategy_id = %strategy.id,
        root = %config.local_storage_path,
        "Seeded default local storage strategy"
    );
    Ok(())
}

pub async fn initialize_app(config: AppConfig) -> anyhow::Result<(SharedState, Router)> {
    let pool = setup_database(&config).await?;

    let strategies = StrategyRepository::new(pool.clone());
    let assignments = AssignmentRepository::new(pool.clone());
    let assets = AssetRepository::new(pool);

    seed_local_strategy(&strategies, &config).await?;

    let policy = UploadPolicy {
        max_size_bytes: config.max_upload_bytes,
        allowed_content_types: config.allowed_content_types.clone(),
        allowed_extensions: config.allowed_extensions.clone(),
    };

    let service = StorageService::new(
        Arc::new(strategies.clone()),
        Arc::new(assignments.clone()),
        Arc::new(assets.clone()),
        Arc::new(LiveProviderFactory::default()),
        policy,
    );

    let state: SharedState = Arc::new(AppState {
        config,
        service,
        strategies,
        assignments,
        assets,
        http: reqwest::Client::new(),
    });

    let router = build_router(state.clone());
    Ok((state, router))
}
