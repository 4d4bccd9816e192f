//! Pictor Core Library
//!
//! This crate provides core domain models, error types, configuration, and validation
//! that are shared across all Pictor components.

pub mod config;
pub mod constants;
pub mod digest;
pub mod error;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::AppConfig;
pub use digest::{ContentDigest, SHARE_ID_LEN};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{Asset, StorageAssignment, StorageStrategy, StrategyKind};
