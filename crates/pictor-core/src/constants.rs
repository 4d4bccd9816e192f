//! Shared constants for upload policy and storage defaults.

/// Default ceiling for a single uploaded image body.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// MIME types accepted by the central upload policy.
pub const ALLOWED_CONTENT_TYPES: &[&str] =
    &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// File extensions accepted by the central upload policy.
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Default per-assignment quota in bytes, keyed by strategy kind.
/// Mirrors what administrators typically grant per backend class.
pub const DEFAULT_QUOTA_LOCAL: i64 = 100 * 1024 * 1024; // 100 MiB
pub const DEFAULT_QUOTA_GITHUB: i64 = 1024 * 1024 * 1024; // 1 GiB
pub const DEFAULT_QUOTA_ONEDRIVE: i64 = 5 * 1024 * 1024 * 1024; // 5 GiB
pub const DEFAULT_QUOTA_OBJECT_STORE: i64 = 10 * 1024 * 1024 * 1024; // 10 GiB
