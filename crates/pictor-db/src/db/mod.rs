//! Database repositories for the storage core.
//!
//! Each repository owns one table and implements the matching persistence
//! trait from the services crate.

pub mod asset;
pub mod assignment;
pub mod strategy;

pub use asset::AssetRepository;
pub use assignment::AssignmentRepository;
pub use strategy::StrategyRepository;
