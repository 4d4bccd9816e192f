//! Postgres persistence for strategies, assignments, and assets.

pub mod db;

pub use db::{AssetRepository, AssignmentRepository, StrategyRepository};
