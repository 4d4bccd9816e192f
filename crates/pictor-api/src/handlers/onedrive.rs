//! OneDrive account connection.
//!
//! An administrator completes the OAuth consent flow in a browser and posts
//! the authorization code here; the resulting token set is stored back into
//! the strategy config. Refreshes after this point happen inside the backend.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use pictor_core::models::OnedriveConfig;
use pictor_core::{AppError, StrategyKind};
use pictor_services::map_store_error;
use pictor_storage::onedrive::{exchange_code, login_endpoint_for};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::HttpAppError;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct ExchangeRequest {
    pub code: String,
    pub redirect_uri: String,
}

#[derive(Debug, Serialize)]
pub struct ExchangeResponse {
    pub strategy_id: Uuid,
    pub expires_at_ms: i64,
}

#[tracing::instrument(skip(state, request), fields(strategy_id = %id))]
pub async fn exchange_onedrive_code(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ExchangeRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let strategy = state
        .strategies
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("storage strategy {}", id)))?;
    if strategy.kind != StrategyKind::Onedrive {
        return Err(AppError::Validation(format!(
            "strategy '{}' is not a OneDrive strategy",
            strategy.name
        ))
        .into());
    }

    let mut config: OnedriveConfig = serde_json::from_value(strategy.config)?;
    let login_endpoint = config
        .login_endpoint
        .clone()
        .unwrap_or_else(|| login_endpoint_for(config.region).to_string());

    let tokens = exchange_code(
        &state.http,
        &login_endpoint,
        &config.client_id,
        &config.client_secret,
        &request.code,
        &request.redirect_uri,
    )
    .await
    .map_err(|e| map_store_error("onedrive", e))?;

    config.access_token = tokens.access_token;
    config.refresh_token = tokens.refresh_token;
    config.expires_at_ms = tokens.expires_at_ms;
    state
        .strategies
        .update_config(id, serde_json::to_value(&config)?)
        .await?;

    tracing::info!("OneDrive account connected");
    Ok(Json(ExchangeResponse {
        strategy_id: id,
        expires_at_ms: config.expires_at_ms,
    }))
}
