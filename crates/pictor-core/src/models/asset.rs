//! Asset model: the persisted record of one stored object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One stored object, owned by a tenant and a strategy.
///
/// `(tenant_id, digest)` maps to at most one row — the dedup invariant, backed
/// by a unique index. Rows are immutable after creation except for visibility;
/// deletion must also invoke the owning backend's delete operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub strategy_id: Uuid,
    /// 64-character lowercase hex SHA-256 of the body.
    pub digest: String,
    /// First 32 hex characters of the digest; the public retrieval identity.
    pub share_id: String,
    /// Storage path under the owning strategy.
    pub path: String,
    pub size: i64,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub content_type: String,
    pub extension: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}
