//! Typed backend configurations.
//!
//! Each storage strategy stores an opaque JSON blob; the provider factory
//! deserializes it into one of these structs based on the strategy kind.
//! Credentials always travel through these structs — backends never read
//! environment variables themselves.

use serde::{Deserialize, Serialize};

/// Local filesystem backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Root directory for stored files.
    pub root: String,
    /// Base URL under which the root is publicly served.
    pub base_url: String,
}

/// S3-compatible object storage (AWS S3, MinIO, DigitalOcean Spaces, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    pub bucket: String,
    /// Custom endpoint for S3-compatible providers. Defaults to AWS.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Path-style addressing (`endpoint/bucket/key`) instead of virtual-host style.
    #[serde(default)]
    pub force_path_style: bool,
    /// Optional custom domain used for public URL resolution.
    #[serde(default)]
    pub custom_domain: Option<String>,
}

/// Aliyun OSS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OssConfig {
    pub access_key_id: String,
    pub access_key_secret: String,
    pub region: String,
    pub bucket: String,
    /// Endpoint override for tests; defaults to `oss-{region}.aliyuncs.com`.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub custom_domain: Option<String>,
}

/// Tencent COS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CosConfig {
    pub secret_id: String,
    pub secret_key: String,
    pub region: String,
    pub bucket: String,
    /// Endpoint override for tests; defaults to `{bucket}.cos.{region}.myqcloud.com`.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub custom_domain: Option<String>,
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_repo_path() -> String {
    "uploads".to_string()
}

/// GitHub repository-backed store (contents API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    pub token: String,
    pub owner: String,
    pub repo: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Path prefix inside the repository.
    #[serde(default = "default_repo_path")]
    pub path: String,
    /// API endpoint override for tests; defaults to `https://api.github.com`.
    #[serde(default)]
    pub api_endpoint: Option<String>,
}

/// OneDrive endpoint family. Global and the 21Vianet-operated sovereign cloud
/// use disjoint Graph/login hosts; mixing them always fails authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OnedriveRegion {
    #[default]
    Global,
    China,
}

fn default_folder() -> String {
    "/Images".to_string()
}

/// Token-based OneDrive store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnedriveConfig {
    pub client_id: String,
    pub client_secret: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Absolute expiry of the access token (unix millis).
    #[serde(default)]
    pub expires_at_ms: i64,
    #[serde(default)]
    pub region: OnedriveRegion,
    #[serde(default = "default_folder")]
    pub folder: String,
    /// Graph endpoint override for tests.
    #[serde(default)]
    pub graph_endpoint: Option<String>,
    /// Login endpoint override for tests.
    #[serde(default)]
    pub login_endpoint: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_github_config_defaults() {
        let cfg: GithubConfig = serde_json::from_value(serde_json::json!({
            "token": "t", "owner": "o", "repo": "r"
        }))
        .unwrap();
        assert_eq!(cfg.branch, "main");
        assert_eq!(cfg.path, "uploads");
        assert!(cfg.api_endpoint.is_none());
    }

    #[test]
    fn test_onedrive_region_defaults_to_global() {
        let cfg: OnedriveConfig = serde_json::from_value(serde_json::json!({
            "client_id": "c", "client_secret": "s",
            "access_token": "a", "refresh_token": "r"
        }))
        .unwrap();
        assert_eq!(cfg.region, OnedriveRegion::Global);
        assert_eq!(cfg.folder, "/Images");
        assert_eq!(cfg.expires_at_ms, 0);
    }
}
