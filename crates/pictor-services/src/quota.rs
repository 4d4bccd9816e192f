//! Quota enforcement.

use pictor_core::constants::{
    DEFAULT_QUOTA_GITHUB, DEFAULT_QUOTA_LOCAL, DEFAULT_QUOTA_OBJECT_STORE, DEFAULT_QUOTA_ONEDRIVE,
};
use pictor_core::{AppError, StrategyKind};

/// Default quota granted when an assignment is created without an explicit one.
pub fn default_quota_for(kind: StrategyKind) -> i64 {
    match kind {
        StrategyKind::Local => DEFAULT_QUOTA_LOCAL,
        StrategyKind::Github => DEFAULT_QUOTA_GITHUB,
        StrategyKind::Onedrive => DEFAULT_QUOTA_ONEDRIVE,
        StrategyKind::S3 | StrategyKind::Oss | StrategyKind::Cos => DEFAULT_QUOTA_OBJECT_STORE,
    }
}

/// Reject an upload that would push usage past the assignment quota.
///
/// Runs strictly before any backend I/O. `None` quota means unlimited.
pub fn check_quota(quota_bytes: Option<i64>, used: i64, requested: i64) -> Result<(), AppError> {
    let Some(limit) = quota_bytes else {
        return Ok(());
    };
    if used.saturating_add(requested) > limit {
        return Err(AppError::QuotaExceeded {
            used,
            limit,
            requested,
        });
    }
    Ok(())
}
