//! Image upload endpoint.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use bytes::Bytes;
use pictor_core::AppError;
use pictor_services::UploadRequest;
use uuid::Uuid;

use crate::error::HttpAppError;
use crate::state::SharedState;
use crate::tenant::TenantId;

struct FilePart {
    filename: String,
    content_type: String,
    data: Bytes,
}

#[tracing::instrument(skip(state, multipart), fields(tenant_id = %tenant_id))]
pub async fn upload(
    State(state): State<SharedState>,
    TenantId(tenant_id): TenantId,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let mut file: Option<FilePart> = None;
    let mut strategy_id: Option<Uuid> = None;
    let mut is_public = true;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {}", e)))?
    {
        match field.name() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .ok_or_else(|| {
                        AppError::Validation("File part has no filename".to_string())
                    })?
                    .to_string();
                let content_type = field
                    .content_type()
                    .ok_or_else(|| {
                        AppError::Validation("File part has no content type".to_string())
                    })?
                    .to_string();
                let data = field.bytes().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read file body: {}", e))
                })?;
                file = Some(FilePart {
                    filename,
                    content_type,
                    data,
                });
            }
            Some("strategy_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Bad strategy_id field: {}", e)))?;
                strategy_id = Some(Uuid::parse_str(text.trim()).map_err(|e| {
                    AppError::Validation(format!("Invalid strategy_id: {}", e))
                })?);
            }
            Some("is_public") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Bad is_public field: {}", e)))?;
                is_public = text.trim().parse().map_err(|_| {
                    AppError::Validation(format!("Invalid is_public value: {}", text))
                })?;
            }
            _ => {}
        }
    }

    let file = file
        .ok_or_else(|| AppError::Validation("Missing 'file' multipart field".to_string()))?;

    let outcome = state
        .service
        .upload(UploadRequest {
            tenant_id,
            filename: file.filename,
            content_type: file.content_type,
            data: file.data,
            strategy_id,
            is_public,
        })
        .await?;

    let status = if outcome.deduplicated {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(outcome)))
}
