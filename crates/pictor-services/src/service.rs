//! Storage service: the ingestion pipeline plus removal, retrieval, and usage.
//!
//! Pipeline order is load-bearing: validate, digest, dedup lookup, strategy
//! resolution, quota check, dimension probe, backend store, row insert. The
//! dedup short-circuit happens before quota so a re-upload of existing bytes
//! never counts against the tenant, and quota runs strictly before any
//! backend I/O.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use pictor_core::digest::ContentDigest;
use pictor_core::validation::{validate_upload, UploadPolicy};
use pictor_core::{AppError, Asset, StorageStrategy, StrategyKind};
use pictor_storage::{object_path, with_retry, StorageUsage};
use serde::Serialize;
use uuid::Uuid;

use crate::ports::{AssetStore, AssignmentStore, NewAsset, StrategyStore};
use crate::probe::image_dimensions;
use crate::provider::{map_store_error, ProviderFactory};
use crate::quota::check_quota;
use crate::resolve::StrategyResolver;

/// One upload, as received from the transport layer.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub tenant_id: Uuid,
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
    /// Explicit strategy selector; None resolves the tenant default.
    pub strategy_id: Option<Uuid>,
    pub is_public: bool,
}

/// Result of an upload: the surviving asset row and its retrieval URL.
#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub asset: Asset,
    /// True when the bytes already existed for this tenant and no new object
    /// was written.
    pub deduplicated: bool,
    pub url: String,
}

/// Per-strategy usage line for a tenant.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyUsageReport {
    pub strategy_id: Uuid,
    pub strategy_name: String,
    pub kind: StrategyKind,
    pub is_default: bool,
    /// Bytes this tenant has stored on the strategy, from asset rows.
    pub used_bytes: i64,
    pub quota_bytes: Option<i64>,
    /// Whole-backend usage as reported by the provider, when it has a usage
    /// API. Zero sentinel means unknown.
    pub backend: Option<StorageUsage>,
}

pub struct StorageService {
    resolver: StrategyResolver,
    strategies: Arc<dyn StrategyStore>,
    assignments: Arc<dyn AssignmentStore>,
    assets: Arc<dyn AssetStore>,
    factory: Arc<dyn ProviderFactory>,
    policy: UploadPolicy,
}

impl StorageService {
    pub fn new(
        strategies: Arc<dyn StrategyStore>,
        assignments: Arc<dyn AssignmentStore>,
        assets: Arc<dyn AssetStore>,
        factory: Arc<dyn ProviderFactory>,
        policy: UploadPolicy,
    ) -> Self {
        Self {
            resolver: StrategyResolver::new(strategies.clone(), assignments.clone()),
            strategies,
            assignments,
            assets,
            factory,
            policy,
        }
    }

    #[tracing::instrument(
        skip(self, request),
        fields(tenant_id = %request.tenant_id, filename = %request.filename, size = request.data.len())
    )]
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadOutcome, AppError> {
        let extension = validate_upload(
            request.data.len(),
            &request.filename,
            &request.content_type,
            &self.policy,
        )?;

        let digest = ContentDigest::from_bytes(&request.data);

        if let Some(existing) = self
            .assets
            .find_by_tenant_and_digest(request.tenant_id, digest.as_hex())
            .await?
        {
            tracing::info!(digest = %digest.as_hex(), "Upload deduplicated against existing asset");
            let url = self.url_for(&existing).await?;
            return Ok(UploadOutcome {
                asset: existing,
                deduplicated: true,
                url,
            });
        }

        let target = self
            .resolver
            .resolve(request.tenant_id, request.strategy_id)
            .await?;

        // Quota bounds the tenant's usage across all strategies, so bytes
        // parked on another backend still count against this upload.
        let used = self.assets.total_size(request.tenant_id).await?;
        check_quota(
            target.assignment.quota_bytes,
            used,
            request.data.len() as i64,
        )?;

        let dimensions = image_dimensions(&request.data);
        let path = object_path(request.tenant_id, &digest, &extension, Utc::now());

        let provider = self.factory.provider_for(&target.strategy).await?;
        let backend = target.strategy.kind.to_string();
        let stored = with_retry("store", || {
            provider.store(&path, &request.content_type, request.data.clone())
        })
        .await
        .map_err(|e| map_store_error(&backend, e))?;

        let (asset, created) = self
            .assets
            .insert_if_absent(NewAsset {
                tenant_id: request.tenant_id,
                strategy_id: target.strategy.id,
                digest: digest.as_hex().to_string(),
                share_id: digest.share_id().to_string(),
                path: stored.path,
                size: stored.size as i64,
                width: dimensions.map(|(w, _)| w),
                height: dimensions.map(|(_, h)| h),
                content_type: request.content_type.clone(),
                extension,
                is_public: request.is_public,
            })
            .await?;

        // Lost a race against an identical concurrent upload. The object the
        // loser wrote is byte-identical at the same digest-derived path, so
        // the surviving row remains consistent.
        let deduplicated = !created;

        let url = self.url_for(&asset).await?;

        tracing::info!(
            asset_id = %asset.id,
            strategy = %target.strategy.name,
            digest = %asset.digest,
            deduplicated,
            "Upload complete"
        );

        Ok(UploadOutcome {
            asset,
            deduplicated,
            url,
        })
    }

    /// Delete an asset: backend object first, then the row. Removal is
    /// idempotent end to end: backend deletes of absent objects succeed, and a
    /// second call finds no row and reports false without erroring.
    #[tracing::instrument(skip(self), fields(tenant_id = %tenant_id, asset_id = %asset_id))]
    pub async fn remove(&self, tenant_id: Uuid, asset_id: Uuid) -> Result<bool, AppError> {
        let Some(asset) = self
            .assets
            .get(asset_id)
            .await?
            .filter(|a| a.tenant_id == tenant_id)
        else {
            return Ok(false);
        };

        match self.strategies.get(asset.strategy_id).await? {
            Some(strategy) => {
                let provider = self.factory.provider_for(&strategy).await?;
                let backend = strategy.kind.to_string();
                with_retry("delete", || provider.delete(&asset.path))
                    .await
                    .map_err(|e| map_store_error(&backend, e))?;
            }
            None => {
                tracing::warn!(
                    strategy_id = %asset.strategy_id,
                    "Asset's strategy no longer exists; removing row only"
                );
            }
        }

        self.assets.delete(asset.id).await?;
        tracing::info!("Asset removed");
        Ok(true)
    }

    /// Resolve a public share id to the asset and its retrieval URL.
    pub async fn resolve_share(&self, share_id: &str) -> Result<(Asset, String), AppError> {
        let asset = self
            .assets
            .find_by_share_id(share_id)
            .await?
            .filter(|a| a.is_public)
            .ok_or_else(|| AppError::NotFound(format!("share {}", share_id)))?;
        let url = self.url_for(&asset).await?;
        Ok((asset, url))
    }

    /// Usage lines for every active assignment of a tenant. Backend-side usage
    /// is best effort: a backend failure degrades the line, not the report.
    #[tracing::instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn usage_report(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<StrategyUsageReport>, AppError> {
        let mut report = Vec::new();
        for assignment in self.assignments.list_for_tenant(tenant_id).await? {
            if !assignment.is_active {
                continue;
            }
            let Some(strategy) = self.strategies.get(assignment.strategy_id).await? else {
                continue;
            };
            let used_bytes = self.assets.sum_size(tenant_id, strategy.id).await?;
            let backend = match self.backend_usage(&strategy).await {
                Ok(usage) => Some(usage),
                Err(err) => {
                    tracing::warn!(strategy = %strategy.name, error = %err, "Backend usage unavailable");
                    None
                }
            };
            report.push(StrategyUsageReport {
                strategy_id: strategy.id,
                strategy_name: strategy.name.clone(),
                kind: strategy.kind,
                is_default: assignment.is_default,
                used_bytes,
                quota_bytes: assignment.quota_bytes,
                backend,
            });
        }
        Ok(report)
    }

    async fn backend_usage(&self, strategy: &StorageStrategy) -> Result<StorageUsage, AppError> {
        let provider = self.factory.provider_for(strategy).await?;
        provider
            .usage()
            .await
            .map_err(|e| map_store_error(&strategy.kind.to_string(), e))
    }

    async fn url_for(&self, asset: &Asset) -> Result<String, AppError> {
        let strategy = self
            .strategies
            .get(asset.strategy_id)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "asset {} references missing strategy {}",
                    asset.id, asset.strategy_id
                ))
            })?;
        let provider = self.factory.provider_for(&strategy).await?;
        provider
            .resolve_url(&asset.path)
            .await
            .map_err(|e| map_store_error(&strategy.kind.to_string(), e))
    }
}
