//! Administrative strategy management.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use pictor_core::models::{
    CosConfig, GithubConfig, LocalConfig, OnedriveConfig, OssConfig, S3Config,
};
use pictor_core::{AppError, StrategyKind};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::HttpAppError;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct CreateStrategyRequest {
    pub name: String,
    pub kind: StrategyKind,
    pub config: serde_json::Value,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStrategyRequest {
    pub is_active: bool,
}

/// Reject a config blob that does not parse as the kind's typed config.
/// Misconfiguration surfaces here, at admin time, not at first upload.
fn validate_config(kind: StrategyKind, config: &serde_json::Value) -> Result<(), AppError> {
    let result = match kind {
        StrategyKind::Local => serde_json::from_value::<LocalConfig>(config.clone()).map(|_| ()),
        StrategyKind::S3 => serde_json::from_value::<S3Config>(config.clone()).map(|_| ()),
        StrategyKind::Oss => serde_json::from_value::<OssConfig>(config.clone()).map(|_| ()),
        StrategyKind::Cos => serde_json::from_value::<CosConfig>(config.clone()).map(|_| ()),
        StrategyKind::Github => serde_json::from_value::<GithubConfig>(config.clone()).map(|_| ()),
        StrategyKind::Onedrive => {
            serde_json::from_value::<OnedriveConfig>(config.clone()).map(|_| ())
        }
    };
    result.map_err(|e| AppError::Validation(format!("Invalid {} config: {}", kind, e)))
}

#[tracing::instrument(skip(state, request), fields(name = %request.name, kind = %request.kind))]
pub async fn create_strategy(
    State(state): State<SharedState>,
    Json(request): Json<CreateStrategyRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("Strategy name must not be empty".to_string()).into());
    }
    validate_config(request.kind, &request.config)?;
    let strategy = state
        .strategies
        .create(request.name, request.kind, request.config, request.is_default)
        .await?;
    Ok((StatusCode::CREATED, Json(strategy)))
}

pub async fn list_strategies(
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, HttpAppError> {
    let strategies = state.strategies.list().await?;
    Ok(Json(strategies))
}

pub async fn update_strategy(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStrategyRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.strategies.set_active(id, request.is_active).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_strategy_config(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(config): Json<serde_json::Value>,
) -> Result<impl IntoResponse, HttpAppError> {
    let strategy = state
        .strategies
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("storage strategy {}", id)))?;
    validate_config(strategy.kind, &config)?;
    let updated = state.strategies.update_config(id, config).await?;
    Ok(Json(updated))
}

pub async fn set_default_strategy(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.strategies.set_default(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_strategy(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.strategies.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
