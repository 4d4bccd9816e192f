//! Tenant-to-strategy assignment: the grant of a storage strategy to a tenant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Links a tenant to a storage strategy.
///
/// Invariants (enforced by the assignment repository):
/// - at most one assignment per tenant has `is_default = true`;
/// - revoking the only default promotes the oldest remaining active assignment,
///   or leaves the tenant with zero defaults (uploads then fail with
///   `NO_STORAGE_AVAILABLE`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageAssignment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub strategy_id: Uuid,
    /// Quota in bytes. `None` means unlimited.
    pub quota_bytes: Option<i64>,
    pub is_default: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
