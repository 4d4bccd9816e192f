//! Storage strategy model: a configured, named instance of a storage backend.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Storage backend kinds
///
/// Defined in core because it's used in configuration and database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "strategy_kind", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Local,
    S3,
    Oss,
    Cos,
    Github,
    Onedrive,
}

impl FromStr for StrategyKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(StrategyKind::Local),
            "s3" => Ok(StrategyKind::S3),
            "oss" => Ok(StrategyKind::Oss),
            "cos" => Ok(StrategyKind::Cos),
            "github" => Ok(StrategyKind::Github),
            "onedrive" => Ok(StrategyKind::Onedrive),
            _ => Err(anyhow::anyhow!("Invalid strategy kind: {}", s)),
        }
    }
}

impl Display for StrategyKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StrategyKind::Local => write!(f, "local"),
            StrategyKind::S3 => write!(f, "s3"),
            StrategyKind::Oss => write!(f, "oss"),
            StrategyKind::Cos => write!(f, "cos"),
            StrategyKind::Github => write!(f, "github"),
            StrategyKind::Onedrive => write!(f, "onedrive"),
        }
    }
}

/// A configured storage backend instance, created by an administrator.
///
/// The `config` blob is backend-specific and deserialized into a typed struct
/// by the provider factory (see `models::backend_config`). A strategy is never
/// hard-deleted while any tenant holds an active assignment to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageStrategy {
    pub id: Uuid,
    pub name: String,
    pub kind: StrategyKind,
    pub config: serde_json::Value,
    pub is_active: bool,
    /// At most one strategy is the global default; it seeds new tenant assignments.
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in [
            StrategyKind::Local,
            StrategyKind::S3,
            StrategyKind::Oss,
            StrategyKind::Cos,
            StrategyKind::Github,
            StrategyKind::Onedrive,
        ] {
            assert_eq!(kind.to_string().parse::<StrategyKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_kind_rejects_unknown() {
        assert!("ftp".parse::<StrategyKind>().is_err());
    }
}
