//! Tencent COS backend.
//!
//! Requests carry the COS `q-sign` authorization: a SignKey derived from the
//! secret key over a validity window, then HMAC-SHA1 over a digest of the
//! canonical request. No usage API; zero sentinel.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use hmac::{Hmac, Mac};
use pictor_core::models::CosConfig;
use pictor_core::StrategyKind;
use sha1::{Digest, Sha1};

use crate::paths::validate_path;
use crate::traits::{ObjectStore, StorageUsage, StoreError, StoreResult, StoredObject};

type HmacSha1 = Hmac<Sha1>;

/// Signature validity window in seconds.
const SIGN_WINDOW_SECS: i64 = 600;

fn hmac_sha1_hex(key: &[u8], data: &str) -> String {
    let mut mac = HmacSha1::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn sha1_hex(data: &str) -> String {
    hex::encode(Sha1::digest(data.as_bytes()))
}

/// Tencent COS storage implementation
#[derive(Clone)]
pub struct CosStore {
    config: CosConfig,
    http: reqwest::Client,
}

impl CosStore {
    pub fn new(config: CosConfig) -> StoreResult<Self> {
        if config.secret_id.is_empty() || config.secret_key.is_empty() {
            return Err(StoreError::Config(
                "COS credentials are not configured".to_string(),
            ));
        }
        if config.bucket.is_empty() || config.region.is_empty() {
            return Err(StoreError::Config(
                "COS bucket and region must be configured".to_string(),
            ));
        }
        Ok(CosStore {
            config,
            http: reqwest::Client::new(),
        })
    }

    fn object_url(&self, path: &str) -> String {
        match &self.config.endpoint {
            Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), path),
            None => format!(
                "https://{}.cos.{}.myqcloud.com/{}",
                self.config.bucket, self.config.region, path
            ),
        }
    }

    /// Build the `q-sign` authorization for a method and object path.
    ///
    /// Empty header and parameter lists: the signature covers the method and
    /// path only, which COS accepts for simple object PUT and DELETE.
    fn sign(&self, method: &str, path: &str, now_secs: i64) -> String {
        let key_time = format!("{};{}", now_secs, now_secs + SIGN_WINDOW_SECS);
        let sign_key = {
            let mut mac = HmacSha1::new_from_slice(self.config.secret_key.as_bytes())
                .expect("HMAC accepts any key length");
            mac.update(key_time.as_bytes());
            mac.finalize().into_bytes()
        };

        let http_string = format!("{}\n/{}\n\n\n", method.to_lowercase(), path);
        let string_to_sign = format!("sha1\n{}\n{}\n", key_time, sha1_hex(&http_string));
        let signature = hmac_sha1_hex(&sign_key, &string_to_sign);

        format!(
            "q-sign-algorithm=sha1&q-ak={}&q-sign-time={}&q-key-time={}&q-header-list=&q-url-param-list=&q-signature={}",
            self.config.secret_id, key_time, key_time, signature
        )
    }
}

#[async_trait]
impl ObjectStore for CosStore {
    async fn store(
        &self,
        path: &str,
        content_type: &str,
        data: Bytes,
    ) -> StoreResult<StoredObject> {
        validate_path(path)?;

        let size = data.len() as u64;
        let authorization = self.sign("PUT", path, Utc::now().timestamp());

        let response = self
            .http
            .put(self.object_url(path))
            .header("Authorization", authorization)
            .header("Content-Type", content_type)
            .body(data)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::from_status(
                status.as_u16(),
                format!("COS upload failed: {}", body),
            ));
        }

        tracing::info!(
            bucket = %self.config.bucket,
            path = %path,
            size_bytes = size,
            "COS upload successful"
        );

        Ok(StoredObject {
            path: path.to_string(),
            size,
        })
    }

    async fn delete(&self, path: &str) -> StoreResult<()> {
        validate_path(path)?;

        let authorization = self.sign("DELETE", path, Utc::now().timestamp());

        let response = self
            .http
            .delete(self.object_url(path))
            .header("Authorization", authorization)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() && status.as_u16() != 404 {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::from_status(
                status.as_u16(),
                format!("COS delete failed: {}", body),
            ));
        }

        tracing::info!(bucket = %self.config.bucket, path = %path, "COS delete successful");
        Ok(())
    }

    async fn resolve_url(&self, path: &str) -> StoreResult<String> {
        validate_path(path)?;
        if let Some(domain) = &self.config.custom_domain {
            return Ok(format!("{}/{}", domain.trim_end_matches('/'), path));
        }
        Ok(self.object_url(path))
    }

    async fn usage(&self) -> StoreResult<StorageUsage> {
        Ok(StorageUsage::unknown())
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Cos
    }
}
