//! Shared application state.

use std::sync::Arc;

use pictor_core::AppConfig;
use pictor_db::{AssetRepository, AssignmentRepository, StrategyRepository};
use pictor_services::StorageService;

pub struct AppState {
    pub config: AppConfig,
    pub service: StorageService,
    pub strategies: StrategyRepository,
    pub assignments: AssignmentRepository,
    pub assets: AssetRepository,
    pub http: reqwest::Client,
}

pub type SharedState = Arc<AppState>;
