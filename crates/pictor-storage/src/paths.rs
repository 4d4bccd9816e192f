//! Path generation policy, shared by all backends.
//!
//! Layout: `{tenant}/{year}/{month}/{day}/{digest}.{ext}`. The filename is
//! derived from the content digest, so the path is deterministic across
//! retries: re-uploading identical bytes on the same day produces the
//! identical path, and the digest makes it collision-resistant. The tenant
//! prefix keeps objects private to their owner: dedup is per-tenant, so two
//! tenants holding identical bytes must own two separate backend objects or
//! one tenant's removal would orphan the other's asset.

use chrono::{DateTime, Datelike, Utc};
use pictor_core::digest::ContentDigest;
use uuid::Uuid;

use crate::traits::{StoreError, StoreResult};

/// Build the storage path for a tenant's digest and extension.
pub fn object_path(
    tenant_id: Uuid,
    digest: &ContentDigest,
    extension: &str,
    now: DateTime<Utc>,
) -> String {
    format!(
        "{}/{}/{:02}/{:02}/{}",
        tenant_id,
        now.year(),
        now.month(),
        now.day(),
        digest.filename(extension)
    )
}

/// Reject traversal sequences and absolute paths before a backend touches them.
pub fn validate_path(path: &str) -> StoreResult<()> {
    if path.is_empty() {
        return Err(StoreError::InvalidPath("empty path".to_string()));
    }
    if path.contains("..") || path.starts_with('/') || path.contains('\\') {
        return Err(StoreError::InvalidPath(format!(
            "path contains invalid components: {}",
            path
        )));
    }
    Ok(())
}
