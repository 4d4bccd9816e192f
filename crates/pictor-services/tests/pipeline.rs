//! End-to-end pipeline behavior against in-memory stores and a counting
//! backend: dedup, quota ordering, retry, strategy resolution, removal, and
//! share retrieval.

mod support;

use std::sync::Arc;

use bytes::Bytes;
use pictor_core::constants::DEFAULT_QUOTA_OBJECT_STORE;
use pictor_core::validation::UploadPolicy;
use pictor_core::{ErrorMetadata, StrategyKind};
use pictor_services::{AssignmentStore, StorageService, UploadRequest};
use support::*;
use uuid::Uuid;

struct Fixture {
    strategies: Arc<InMemoryStrategies>,
    assignments: Arc<InMemoryAssignments>,
    assets: Arc<InMemoryAssets>,
    provider: Arc<CountingStore>,
    service: StorageService,
}

fn fixture_with(provider: CountingStore) -> Fixture {
    let strategies = Arc::new(InMemoryStrategies::default());
    let assignments = Arc::new(InMemoryAssignments::default());
    let assets = Arc::new(InMemoryAssets::default());
    let provider = Arc::new(provider);
    let service = StorageService::new(
        strategies.clone(),
        assignments.clone(),
        assets.clone(),
        Arc::new(FixedFactory {
            provider: provider.clone(),
        }),
        UploadPolicy::default(),
    );
    Fixture {
        strategies,
        assignments,
        assets,
        provider,
        service,
    }
}

fn fixture() -> Fixture {
    fixture_with(CountingStore::new())
}

/// Strategy assigned to the tenant, returning (tenant_id, strategy_id).
fn assigned_tenant(fx: &Fixture, quota: Option<i64>) -> (Uuid, Uuid) {
    let strategy = make_strategy(StrategyKind::S3, false);
    let strategy_id = strategy.id;
    fx.strategies.add(strategy);
    let tenant_id = Uuid::new_v4();
    fx.assignments
        .add(make_assignment(tenant_id, strategy_id, quota));
    (tenant_id, strategy_id)
}

fn request(tenant_id: Uuid, body: &'static [u8]) -> UploadRequest {
    UploadRequest {
        tenant_id,
        filename: "photo.png".to_string(),
        content_type: "image/png".to_string(),
        data: Bytes::from_static(body),
        strategy_id: None,
        is_public: true,
    }
}

#[tokio::test]
async fn test_identical_bytes_dedupe_to_one_object() {
    let fx = fixture();
    let (tenant, _) = assigned_tenant(&fx, None);

    let first = fx.service.upload(request(tenant, b"same bytes")).await.unwrap();
    let second = fx.service.upload(request(tenant, b"same bytes")).await.unwrap();

    assert!(!first.deduplicated);
    assert!(second.deduplicated);
    assert_eq!(first.asset.id, second.asset.id);
    assert_eq!(first.asset.share_id, second.asset.share_id);
    assert_eq!(fx.provider.store_count(), 1);
    assert_eq!(fx.assets.count(), 1);
}

#[tokio::test]
async fn test_dedup_is_scoped_per_tenant() {
    let fx = fixture();
    let (tenant_a, strategy_id) = assigned_tenant(&fx, None);
    let tenant_b = Uuid::new_v4();
    fx.assignments
        .add(make_assignment(tenant_b, strategy_id, None));

    fx.service.upload(request(tenant_a, b"shared bytes")).await.unwrap();
    let other = fx.service.upload(request(tenant_b, b"shared bytes")).await.unwrap();

    assert!(!other.deduplicated);
    assert_eq!(fx.provider.store_count(), 2);
    assert_eq!(fx.assets.count(), 2);
}

#[tokio::test]
async fn test_tenants_with_identical_bytes_own_separate_objects() {
    let fx = fixture();
    let (tenant_a, strategy_id) = assigned_tenant(&fx, None);
    let tenant_b = Uuid::new_v4();
    fx.assignments
        .add(make_assignment(tenant_b, strategy_id, None));

    let a = fx.service.upload(request(tenant_a, b"common bytes")).await.unwrap();
    let b = fx.service.upload(request(tenant_b, b"common bytes")).await.unwrap();

    // Same digest, but the backend objects are tenant-scoped: one tenant's
    // removal must not touch the object backing the other's asset.
    assert_eq!(a.asset.digest, b.asset.digest);
    assert_ne!(a.asset.path, b.asset.path);
    assert!(a.asset.path.starts_with(&tenant_a.to_string()));
    assert!(b.asset.path.starts_with(&tenant_b.to_string()));

    assert!(fx.service.remove(tenant_a, a.asset.id).await.unwrap());
    assert_eq!(fx.provider.delete_count(), 1);
    assert_eq!(fx.assets.count(), 1);
    let (survivor, _) = fx
        .service
        .resolve_share(&b.asset.share_id)
        .await
        .unwrap();
    assert_eq!(survivor.id, b.asset.id);
}

#[tokio::test]
async fn test_quota_rejection_precedes_backend_io() {
    let fx = fixture();
    let (tenant, _) = assigned_tenant(&fx, Some(4));

    let err = fx.service.upload(request(tenant, b"12345")).await.unwrap_err();
    assert_eq!(err.error_code(), "QUOTA_EXCEEDED");
    assert_eq!(fx.provider.store_count(), 0);
    assert_eq!(fx.assets.count(), 0);
}

#[tokio::test]
async fn test_quota_counts_usage_across_strategies() {
    static FIRST: [u8; 60] = [3; 60];
    static SECOND: [u8; 50] = [4; 50];

    let fx = fixture();
    let (tenant, _) = assigned_tenant(&fx, None);
    let other = make_strategy(StrategyKind::Github, false);
    let other_id = other.id;
    fx.strategies.add(other);
    let mut grant = make_assignment(tenant, other_id, Some(80));
    grant.is_default = false;
    fx.assignments.add(grant);

    // 60 bytes land on the default strategy; the second strategy's 80-byte
    // quota bounds the tenant's usage everywhere, so 60 + 50 is over it.
    fx.service.upload(request(tenant, &FIRST)).await.unwrap();
    let mut req = request(tenant, &SECOND);
    req.strategy_id = Some(other_id);
    let err = fx.service.upload(req).await.unwrap_err();
    assert_eq!(err.error_code(), "QUOTA_EXCEEDED");
    assert_eq!(fx.provider.store_count(), 1);
}

#[tokio::test]
async fn test_dedup_short_circuits_before_quota() {
    let fx = fixture();
    let (tenant, _) = assigned_tenant(&fx, Some(10));

    fx.service.upload(request(tenant, b"0123456789")).await.unwrap();
    // Quota is now exhausted, but re-uploading the same bytes is free.
    let again = fx.service.upload(request(tenant, b"0123456789")).await.unwrap();
    assert!(again.deduplicated);
}

#[tokio::test]
async fn test_transient_backend_failures_are_retried() {
    let fx = fixture_with(CountingStore::failing(2, 503));
    let (tenant, _) = assigned_tenant(&fx, None);

    let outcome = fx.service.upload(request(tenant, b"persistent")).await.unwrap();
    assert!(!outcome.deduplicated);
    assert_eq!(fx.provider.store_count(), 3);
    assert_eq!(fx.assets.count(), 1);
}

#[tokio::test]
async fn test_terminal_backend_failure_is_not_retried() {
    let fx = fixture_with(CountingStore::failing(10, 403));
    let (tenant, _) = assigned_tenant(&fx, None);

    let err = fx.service.upload(request(tenant, b"denied")).await.unwrap_err();
    assert_eq!(err.error_code(), "BACKEND_ERROR");
    assert!(!err.is_recoverable());
    assert_eq!(fx.provider.store_count(), 1);
    assert_eq!(fx.assets.count(), 0);
}

#[tokio::test]
async fn test_unassigned_tenant_has_no_storage() {
    let fx = fixture();
    let err = fx
        .service
        .upload(request(Uuid::new_v4(), b"homeless"))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "NO_STORAGE_AVAILABLE");
}

#[tokio::test]
async fn test_first_contact_bootstraps_onto_default_strategy() {
    let fx = fixture();
    fx.strategies.add(make_strategy(StrategyKind::S3, true));
    let tenant = Uuid::new_v4();

    let outcome = fx.service.upload(request(tenant, b"first upload")).await.unwrap();
    assert!(!outcome.deduplicated);
    assert_eq!(fx.assignments.count(), 1);

    let assignment = fx
        .assignments
        .find_default(tenant)
        .await
        .unwrap()
        .expect("bootstrap should create a default assignment");
    assert_eq!(assignment.quota_bytes, Some(DEFAULT_QUOTA_OBJECT_STORE));
}

#[tokio::test]
async fn test_revoked_tenant_is_not_rebootstrapped() {
    let fx = fixture();
    let default_strategy = make_strategy(StrategyKind::S3, true);
    let strategy_id = default_strategy.id;
    fx.strategies.add(default_strategy);
    let tenant = Uuid::new_v4();
    // An inactive assignment exists: the tenant was revoked, not new.
    let mut revoked = make_assignment(tenant, strategy_id, None);
    revoked.is_active = false;
    revoked.is_default = false;
    fx.assignments.add(revoked);

    let err = fx.service.upload(request(tenant, b"blocked")).await.unwrap_err();
    assert_eq!(err.error_code(), "NO_STORAGE_AVAILABLE");
    assert_eq!(fx.assignments.count(), 1);
}

#[tokio::test]
async fn test_explicit_selector_requires_assignment() {
    let fx = fixture();
    let unassigned = make_strategy(StrategyKind::Github, false);
    let unassigned_id = unassigned.id;
    fx.strategies.add(unassigned);
    let (tenant, _) = assigned_tenant(&fx, None);

    let mut req = request(tenant, b"wrong target");
    req.strategy_id = Some(unassigned_id);
    let err = fx.service.upload(req).await.unwrap_err();
    assert_eq!(err.error_code(), "NO_STORAGE_AVAILABLE");

    // An unknown selector fails the same way, never silently falling back
    // to the tenant default.
    let mut req = request(tenant, b"unknown target");
    req.strategy_id = Some(Uuid::new_v4());
    let err = fx.service.upload(req).await.unwrap_err();
    assert_eq!(err.error_code(), "NO_STORAGE_AVAILABLE");
    assert_eq!(fx.provider.store_count(), 0);
}

#[tokio::test]
async fn test_inactive_strategy_is_rejected() {
    let fx = fixture();
    let mut strategy = make_strategy(StrategyKind::S3, false);
    strategy.is_active = false;
    let strategy_id = strategy.id;
    fx.strategies.add(strategy);
    let tenant = Uuid::new_v4();
    fx.assignments.add(make_assignment(tenant, strategy_id, None));

    let mut req = request(tenant, b"inactive");
    req.strategy_id = Some(strategy_id);
    let err = fx.service.upload(req).await.unwrap_err();
    assert_eq!(err.error_code(), "NO_STORAGE_AVAILABLE");
}

#[tokio::test]
async fn test_concurrent_identical_uploads_keep_one_row() {
    let fx = fixture();
    let (tenant, _) = assigned_tenant(&fx, None);

    let (a, b) = tokio::join!(
        fx.service.upload(request(tenant, b"raced bytes")),
        fx.service.upload(request(tenant, b"raced bytes")),
    );
    let a = a.unwrap();
    let b = b.unwrap();

    assert_eq!(a.asset.id, b.asset.id);
    assert_eq!(fx.assets.count(), 1);
}

#[tokio::test]
async fn test_remove_deletes_backend_object_then_row() {
    let fx = fixture();
    let (tenant, _) = assigned_tenant(&fx, None);
    let outcome = fx.service.upload(request(tenant, b"doomed")).await.unwrap();

    assert!(fx.service.remove(tenant, outcome.asset.id).await.unwrap());
    assert_eq!(fx.provider.delete_count(), 1);
    assert_eq!(fx.assets.count(), 0);

    // Second removal is a no-op success, not an error.
    assert!(!fx.service.remove(tenant, outcome.asset.id).await.unwrap());
    assert_eq!(fx.provider.delete_count(), 1);
}

#[tokio::test]
async fn test_remove_is_scoped_to_owner() {
    let fx = fixture();
    let (tenant, _) = assigned_tenant(&fx, None);
    let outcome = fx.service.upload(request(tenant, b"mine")).await.unwrap();

    let removed = fx
        .service
        .remove(Uuid::new_v4(), outcome.asset.id)
        .await
        .unwrap();
    assert!(!removed);
    assert_eq!(fx.assets.count(), 1);
    assert_eq!(fx.provider.delete_count(), 0);
}

#[tokio::test]
async fn test_share_resolution_serves_public_assets_only() {
    let fx = fixture();
    let (tenant, _) = assigned_tenant(&fx, None);

    let public = fx.service.upload(request(tenant, b"public bytes")).await.unwrap();
    let mut private_req = request(tenant, b"private bytes");
    private_req.is_public = false;
    let private = fx.service.upload(private_req).await.unwrap();

    let (asset, url) = fx
        .service
        .resolve_share(&public.asset.share_id)
        .await
        .unwrap();
    assert_eq!(asset.id, public.asset.id);
    assert_eq!(url, format!("https://cdn.test/{}", asset.path));

    let err = fx
        .service
        .resolve_share(&private.asset.share_id)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "NOT_FOUND");
}

#[tokio::test]
async fn test_share_id_is_stable_digest_prefix() {
    let fx = fixture();
    let (tenant, _) = assigned_tenant(&fx, None);

    let outcome = fx.service.upload(request(tenant, b"stable identity")).await.unwrap();
    assert_eq!(outcome.asset.share_id.len(), 32);
    assert!(outcome.asset.digest.starts_with(&outcome.asset.share_id));
    // The path embeds the digest, but the share id never embeds the path.
    assert!(outcome.asset.path.contains(&outcome.asset.digest));
}

#[tokio::test]
async fn test_quota_lifecycle_with_dedup() {
    static FIRST: [u8; 60] = [1; 60];
    static SECOND: [u8; 50] = [2; 50];

    let fx = fixture();
    let (tenant, _) = assigned_tenant(&fx, Some(100));

    let first = fx.service.upload(request(tenant, &FIRST)).await.unwrap();
    assert!(!first.deduplicated);
    let report = fx.service.usage_report(tenant).await.unwrap();
    assert_eq!(report[0].used_bytes, 60);

    let err = fx.service.upload(request(tenant, &SECOND)).await.unwrap_err();
    assert_eq!(err.error_code(), "QUOTA_EXCEEDED");

    // Re-uploading the original bytes is free and leaves usage unchanged.
    let again = fx.service.upload(request(tenant, &FIRST)).await.unwrap();
    assert!(again.deduplicated);
    let report = fx.service.usage_report(tenant).await.unwrap();
    assert_eq!(report[0].used_bytes, 60);
    assert_eq!(fx.provider.store_count(), 1);
}

#[tokio::test]
async fn test_usage_report_covers_active_assignments() {
    let fx = fixture();
    let (tenant, strategy_id) = assigned_tenant(&fx, Some(1000));
    fx.service.upload(request(tenant, b"12345")).await.unwrap();

    let report = fx.service.usage_report(tenant).await.unwrap();
    assert_eq!(report.len(), 1);
    let line = &report[0];
    assert_eq!(line.strategy_id, strategy_id);
    assert_eq!(line.used_bytes, 5);
    assert_eq!(line.quota_bytes, Some(1000));
    assert!(line.backend.is_some_and(|u| u.is_unknown()));
}
