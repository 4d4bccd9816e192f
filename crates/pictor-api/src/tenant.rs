//! Tenant identity extraction.
//!
//! Callers identify themselves with an `X-Tenant-Id` header. Authentication
//! proper sits in front of this service; here the id only has to be present
//! and well-formed.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use pictor_core::AppError;
use uuid::Uuid;

use crate::error::HttpAppError;

pub struct TenantId(pub Uuid);

impl<S> FromRequestParts<S> for TenantId
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get("x-tenant-id")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                HttpAppError(AppError::Validation(
                    "Missing X-Tenant-Id header".to_string(),
                ))
            })?;
        let id = Uuid::parse_str(raw).map_err(|e| {
            HttpAppError(AppError::Validation(format!("Invalid X-Tenant-Id: {}", e)))
        })?;
        Ok(TenantId(id))
    }
}
