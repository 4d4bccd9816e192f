//! Storage backends.
//!
//! One trait, six implementations: local filesystem, S3-compatible object
//! storage, Aliyun OSS, Tencent COS, GitHub repositories, and OneDrive.
//! Backends receive validated blobs and content-addressed paths; policy
//! (quota, dedup, type checks) lives a layer up.

pub mod cos;
pub mod factory;
pub mod github;
pub mod local;
pub mod onedrive;
pub mod oss;
pub mod paths;
pub mod retry;
pub mod s3;
pub mod traits;

pub use factory::provider_for;
pub use paths::{object_path, validate_path};
pub use retry::with_retry;
pub use traits::{ObjectStore, StorageUsage, StoreError, StoreResult, StoredObject};
