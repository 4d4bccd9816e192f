//! Provider factory.
//!
//! Turns a persisted strategy row into a live backend. The strategy carries an
//! opaque JSON config; the kind decides which typed config it deserializes to.

use std::sync::Arc;

use pictor_core::models::{
    CosConfig, GithubConfig, LocalConfig, OnedriveConfig, OssConfig, S3Config,
};
use pictor_core::{StorageStrategy, StrategyKind};

use crate::cos::CosStore;
use crate::github::GithubStore;
use crate::local::LocalStore;
use crate::onedrive::OnedriveStore;
use crate::oss::OssStore;
use crate::s3::S3Store;
use crate::traits::{ObjectStore, StoreError, StoreResult};

fn parse_config<T: serde::de::DeserializeOwned>(
    strategy: &StorageStrategy,
) -> StoreResult<T> {
    serde_json::from_value(strategy.config.clone()).map_err(|e| {
        StoreError::Config(format!(
            "invalid {} config for strategy '{}': {}",
            strategy.kind, strategy.name, e
        ))
    })
}

/// Instantiate the backend for a strategy.
pub async fn provider_for(strategy: &StorageStrategy) -> StoreResult<Arc<dyn ObjectStore>> {
    let provider: Arc<dyn ObjectStore> = match strategy.kind {
        StrategyKind::Local => {
            let config: LocalConfig = parse_config(strategy)?;
            Arc::new(LocalStore::new(&config).await?)
        }
        StrategyKind::S3 => {
            let config: S3Config = parse_config(strategy)?;
            Arc::new(S3Store::new(config)?)
        }
        StrategyKind::Oss => {
            let config: OssConfig = parse_config(strategy)?;
            Arc::new(OssStore::new(config)?)
        }
        StrategyKind::Cos => {
            let config: CosConfig = parse_config(strategy)?;
            Arc::new(CosStore::new(config)?)
        }
        StrategyKind::Github => {
            let config: GithubConfig = parse_config(strategy)?;
            Arc::new(GithubStore::new(config)?)
        }
        StrategyKind::Onedrive => {
            let config: OnedriveConfig = parse_config(strategy)?;
            Arc::new(OnedriveStore::new(config)?)
        }
    };
    Ok(provider)
}
