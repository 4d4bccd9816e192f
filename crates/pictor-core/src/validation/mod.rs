//! Central upload validation.
//!
//! The type/size policy is backend-agnostic and enforced exactly once, in the
//! ingestion pipeline, before any backend sees the blob. Backends therefore
//! never re-validate.

use crate::constants::{ALLOWED_CONTENT_TYPES, ALLOWED_EXTENSIONS, DEFAULT_MAX_UPLOAD_BYTES};
use crate::error::AppError;

/// The backend-agnostic upload policy: allowed MIME set and size ceiling.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_size_bytes: usize,
    pub allowed_content_types: Vec<String>,
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        UploadPolicy {
            max_size_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_content_types: ALLOWED_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            allowed_extensions: ALLOWED_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Normalize a MIME type by stripping parameters
/// (e.g. "image/jpeg; charset=utf-8" -> "image/jpeg").
fn normalize_mime_type(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .map(|s| s.trim())
        .unwrap_or(content_type)
}

/// Validate content type against the allowlist.
pub fn validate_content_type(content_type: &str, policy: &UploadPolicy) -> Result<(), AppError> {
    let normalized = normalize_mime_type(content_type).to_lowercase();
    if !policy
        .allowed_content_types
        .iter()
        .any(|ct| normalized == ct.to_lowercase())
    {
        return Err(AppError::Validation(format!(
            "Unsupported content type '{}'. Allowed types: {}",
            normalized,
            policy.allowed_content_types.join(", ")
        )));
    }
    Ok(())
}

/// Validate body size against the ceiling. Empty bodies are rejected.
pub fn validate_size(len: usize, policy: &UploadPolicy) -> Result<(), AppError> {
    if len == 0 {
        return Err(AppError::Validation("Empty file body".to_string()));
    }
    if len > policy.max_size_bytes {
        return Err(AppError::Validation(format!(
            "File size {} exceeds maximum allowed size of {} bytes",
            len, policy.max_size_bytes
        )));
    }
    Ok(())
}

/// Extract and validate the file extension.
pub fn validate_extension(filename: &str, policy: &UploadPolicy) -> Result<String, AppError> {
    let extension = filename
        .rsplit('.')
        .next()
        .filter(|ext| *ext != filename)
        .unwrap_or("")
        .to_lowercase();

    if !policy.allowed_extensions.contains(&extension) {
        return Err(AppError::Validation(format!(
            "Unsupported file extension '{}'. Allowed extensions: {}",
            extension,
            policy.allowed_extensions.join(", ")
        )));
    }
    Ok(extension)
}

/// Run the full central policy: size, MIME, extension. Returns the normalized
/// extension on success.
pub fn validate_upload(
    body_len: usize,
    filename: &str,
    content_type: &str,
    policy: &UploadPolicy,
) -> Result<String, AppError> {
    validate_size(body_len, policy)?;
    validate_content_type(content_type, policy)?;
    validate_extension(filename, policy)
}
