//! Domain models shared across Pictor components.

pub mod asset;
pub mod assignment;
pub mod backend_config;
pub mod strategy;

pub use asset::Asset;
pub use assignment::StorageAssignment;
pub use backend_config::{
    CosConfig, GithubConfig, LocalConfig, OnedriveConfig, OnedriveRegion, OssConfig, S3Config,
};
pub use strategy::{StorageStrategy, StrategyKind};
