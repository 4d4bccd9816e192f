//! Application services: ingestion pipeline, strategy resolution, quota,
//! removal, retrieval, and usage reporting. Persistence and backend
//! construction are trait seams filled in by the db crate and the storage
//! factory.

pub mod ports;
pub mod probe;
pub mod provider;
pub mod quota;
pub mod resolve;
pub mod service;

pub use ports::{AssetStore, AssignmentStore, NewAsset, StrategyStore};
pub use provider::{map_store_error, LiveProviderFactory, ProviderFactory};
pub use quota::{check_quota, default_quota_for};
pub use resolve::{ResolvedTarget, StrategyResolver};
pub use service::{StorageService, StrategyUsageReport, UploadOutcome, UploadRequest};
