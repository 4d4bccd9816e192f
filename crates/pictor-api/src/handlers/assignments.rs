//! Administrative tenant assignment management.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use pictor_core::AppError;
use pictor_services::default_quota_for;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::HttpAppError;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct GrantRequest {
    pub tenant_id: Uuid,
    pub strategy_id: Uuid,
    /// Omitted means the per-backend default quota; set `unlimited` to lift it.
    #[serde(default)]
    pub quota_bytes: Option<i64>,
    #[serde(default)]
    pub unlimited: bool,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Deserialize)]
pub struct QuotaRequest {
    pub quota_bytes: Option<i64>,
}

#[tracing::instrument(skip(state, request), fields(tenant_id = %request.tenant_id, strategy_id = %request.strategy_id))]
pub async fn grant_assignment(
    State(state): State<SharedState>,
    Json(request): Json<GrantRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let strategy = state
        .strategies
        .get_by_id(request.strategy_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("storage strategy {}", request.strategy_id)))?;

    if let Some(quota) = request.quota_bytes {
        if quota <= 0 {
            return Err(AppError::Validation("quota_bytes must be positive".to_string()).into());
        }
    }
    let quota = if request.unlimited {
        None
    } else {
        request
            .quota_bytes
            .or_else(|| Some(default_quota_for(strategy.kind)))
    };

    // The first assignment a tenant receives becomes its default.
    let is_first = state
        .assignments
        .list_for_tenant(request.tenant_id)
        .await?
        .is_empty();
    let assignment = state
        .assignments
        .grant(
            request.tenant_id,
            request.strategy_id,
            quota,
            request.is_default || is_first,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

pub async fn list_assignments(
    State(state): State<SharedState>,
    Path(tenant_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let assignments = state.assignments.list_for_tenant(tenant_id).await?;
    Ok(Json(assignments))
}

#[tracing::instrument(skip(state), fields(tenant_id = %tenant_id, strategy_id = %strategy_id))]
pub async fn revoke_assignment(
    State(state): State<SharedState>,
    Path((tenant_id, strategy_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.assignments.revoke(tenant_id, strategy_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_assignment_quota(
    State(state): State<SharedState>,
    Path((tenant_id, strategy_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<QuotaRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    if let Some(quota) = request.quota_bytes {
        if quota <= 0 {
            return Err(AppError::Validation("quota_bytes must be positive".to_string()).into());
        }
    }
    state
        .assignments
        .set_quota(tenant_id, strategy_id, request.quota_bytes)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_default_assignment(
    State(state): State<SharedState>,
    Path((tenant_id, strategy_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.assignments.set_default(tenant_id, strategy_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
