//! Asset listing, deletion, and share-link retrieval.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect};
use axum::Json;
use uuid::Uuid;

use crate::error::HttpAppError;
use crate::state::SharedState;
use crate::tenant::TenantId;

pub async fn list_assets(
    State(state): State<SharedState>,
    TenantId(tenant_id): TenantId,
) -> Result<impl IntoResponse, HttpAppError> {
    let assets = state.assets.list_for_tenant(tenant_id).await?;
    Ok(Json(assets))
}

/// Deleting an already-gone asset still returns 204: the caller's goal is
/// "ensure it is gone" and repeating the request must not fail.
#[tracing::instrument(skip(state), fields(tenant_id = %tenant_id, asset_id = %id))]
pub async fn delete_asset(
    State(state): State<SharedState>,
    TenantId(tenant_id): TenantId,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let removed = state.service.remove(tenant_id, id).await?;
    if !removed {
        tracing::debug!("Asset already absent");
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Public share resolution: the share id is backend-independent, so links
/// survive an asset migrating between strategies.
pub async fn resolve_share(
    State(state): State<SharedState>,
    Path(share_id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let (_asset, url) = state.service.resolve_share(&share_id).await?;
    Ok(Redirect::temporary(&url))
}

pub async fn usage_report(
    State(state): State<SharedState>,
    TenantId(tenant_id): TenantId,
) -> Result<impl IntoResponse, HttpAppError> {
    let report = state.service.usage_report(tenant_id).await?;
    Ok(Json(report))
}
