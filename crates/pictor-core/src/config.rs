//! Configuration module
//!
//! Process-level configuration for the API and services. Built explicitly from the
//! environment at startup; storage backends never read ambient process state — the
//! provider factory hands each backend a typed configuration struct instead.

use std::env;

use crate::constants::{ALLOWED_CONTENT_TYPES, ALLOWED_EXTENSIONS, DEFAULT_MAX_UPLOAD_BYTES};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 20;
const DEFAULT_DB_TIMEOUT_SECS: u64 = 30;

/// Application configuration
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    /// Base URL used to build public share links (e.g. "https://img.example.com").
    pub public_base_url: String,
    /// Root directory for the bootstrap local storage strategy.
    pub local_storage_path: String,
    /// Base URL under which local files are served.
    pub local_storage_base_url: String,
    // Central upload policy (backend-agnostic, enforced once in the pipeline)
    pub max_upload_bytes: usize,
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,
    pub environment: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", DEFAULT_PORT));

        let max_upload_bytes = env::var("MAX_UPLOAD_SIZE_MB")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .map(|mb| mb * 1024 * 1024)
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        let allowed_extensions = env::var("ALLOWED_EXTENSIONS")
            .map(|v| v.split(',').map(|s| s.trim().to_lowercase()).collect())
            .unwrap_or_else(|_| ALLOWED_EXTENSIONS.iter().map(|s| s.to_string()).collect());

        let allowed_content_types = env::var("ALLOWED_CONTENT_TYPES")
            .map(|v| v.split(',').map(|s| s.trim().to_lowercase()).collect())
            .unwrap_or_else(|_| {
                ALLOWED_CONTENT_TYPES
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            });

        Ok(AppConfig {
            server_port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            database_url,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_DB_TIMEOUT_SECS),
            local_storage_path: env::var("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|_| "./data/uploads".to_string()),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL")
                .unwrap_or_else(|_| format!("{}/uploads", public_base_url.trim_end_matches('/'))),
            public_base_url,
            max_upload_bytes,
            allowed_extensions,
            allowed_content_types,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied_when_env_missing() {
        // from_env requires DATABASE_URL only; everything else has defaults.
        // Construct directly to avoid mutating process env in tests.
        let cfg = AppConfig {
            server_port: DEFAULT_PORT,
            database_url: "postgres://localhost/pictor".into(),
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            db_timeout_seconds: DEFAULT_DB_TIMEOUT_SECS,
            public_base_url: "http://localhost:3000".into(),
            local_storage_path: "./data/uploads".into(),
            local_storage_base_url: "http://localhost:3000/uploads".into(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_extensions: ALLOWED_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            allowed_content_types: ALLOWED_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            environment: "development".into(),
        };
        assert!(!cfg.is_production());
        assert_eq!(cfg.max_upload_bytes, 10 * 1024 * 1024);
        assert!(cfg
            .allowed_content_types
            .iter()
            .any(|t| t == "image/png"));
    }
}
