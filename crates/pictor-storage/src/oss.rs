//! Aliyun OSS backend.
//!
//! Uses the OSS header signature scheme: base64(HMAC-SHA1) over
//! `VERB\nContent-MD5\nContent-Type\nDate\nCanonicalizedResource`, sent as
//! `Authorization: OSS {key}:{signature}`. No usage API; zero sentinel.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use chrono::Utc;
use hmac::{Hmac, Mac};
use pictor_core::models::OssConfig;
use pictor_core::StrategyKind;
use sha1::Sha1;

use crate::paths::validate_path;
use crate::traits::{ObjectStore, StorageUsage, StoreError, StoreResult, StoredObject};

type HmacSha1 = Hmac<Sha1>;

fn hmac_sha1_base64(key: &str, data: &str) -> String {
    let mut mac = HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC accepts any key length");
    mac.update(data.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// Aliyun OSS storage implementation
#[derive(Clone)]
pub struct OssStore {
    config: OssConfig,
    http: reqwest::Client,
}

impl OssStore {
    pub fn new(config: OssConfig) -> StoreResult<Self> {
        if config.access_key_id.is_empty() || config.access_key_secret.is_empty() {
            return Err(StoreError::Config(
                "OSS credentials are not configured".to_string(),
            ));
        }
        if config.bucket.is_empty() || config.region.is_empty() {
            return Err(StoreError::Config(
                "OSS bucket and region must be configured".to_string(),
            ));
        }
        Ok(OssStore {
            config,
            http: reqwest::Client::new(),
        })
    }

    fn object_url(&self, path: &str) -> String {
        match &self.config.endpoint {
            Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), path),
            None => format!(
                "https://{}.oss-{}.aliyuncs.com/{}",
                self.config.bucket, self.config.region, path
            ),
        }
    }

    /// Header signature over the canonical string; `date` is RFC 1123 GMT.
    fn sign(&self, verb: &str, content_type: &str, date: &str, path: &str) -> String {
        let resource = format!("/{}/{}", self.config.bucket, path);
        let string_to_sign = format!("{}\n\n{}\n{}\n{}", verb, content_type, date, resource);
        let signature = hmac_sha1_base64(&self.config.access_key_secret, &string_to_sign);
        format!("OSS {}:{}", self.config.access_key_id, signature)
    }

    fn http_date() -> String {
        Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
    }
}

#[async_trait]
impl ObjectStore for OssStore {
    async fn store(
        &self,
        path: &str,
        content_type: &str,
        data: Bytes,
    ) -> StoreResult<StoredObject> {
        validate_path(path)?;

        let size = data.len() as u64;
        let date = Self::http_date();
        let authorization = self.sign("PUT", content_type, &date, path);

        let response = self
            .http
            .put(self.object_url(path))
            .header("Authorization", authorization)
            .header("Date", date)
            .header("Content-Type", content_type)
            .body(data)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::from_status(
                status.as_u16(),
                format!("OSS upload failed: {}", body),
            ));
        }

        tracing::info!(
            bucket = %self.config.bucket,
            path = %path,
            size_bytes = size,
            "OSS upload successful"
        );

        Ok(StoredObject {
            path: path.to_string(),
            size,
        })
    }

    async fn delete(&self, path: &str) -> StoreResult<()> {
        validate_path(path)?;

        let date = Self::http_date();
        let authorization = self.sign("DELETE", "", &date, path);

        let response = self
            .http
            .delete(self.object_url(path))
            .header("Authorization", authorization)
            .header("Date", date)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() && status.as_u16() != 404 {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::from_status(
                status.as_u16(),
                format!("OSS delete failed: {}", body),
            ));
        }

        tracing::info!(bucket = %self.config.bucket, path = %path, "OSS delete successful");
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
        StrategyKind::Oss
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn test_config(endpoint: Option<String>) -> OssConfig {
        OssConfig {
            access_key_id: "oss-key".to_string(),
            access_key_secret: "oss-secret".to_string(),
            region: "cn-hangzhou".to_string(),
            bucket: "imgs".to_string(),
            endpoint,
            custom_domain: None,
        }
    }

    #[test]
    fn test_missing_credentials_fail_fast() {
        let mut config = test_config(None);
        config.access_key_id = String::new();
        assert!(matches!(OssStore::new(config), Err(StoreError::Config(_))));
    }

    #[test]
    fn test_default_url_is_virtual_host() {
        let store = OssStore::new(test_config(None)).unwrap();
        assert_eq!(
            store.object_url("2026/03/07/a.png"),
            "https://imgs.oss-cn-hangzhou.aliyuncs.com/2026/03/07/a.png"
        );
    }

    #[test]
    fn test_signature_shape() {
        let store = OssStore::new(test_config(None)).unwrap();
        let auth = store.sign("PUT", "image/png", "Wed, 01 Jan 2026 00:00:00 GMT", "a/b.png");
        assert!(auth.starts_with("OSS oss-key:"));
        // Same inputs sign identically; different verb signs differently.
        let again = store.sign("PUT", "image/png", "Wed, 01 Jan 2026 00:00:00 GMT", "a/b.png");
        assert_eq!(auth, again);
        let delete = store.sign("DELETE", "", "Wed, 01 Jan 2026 00:00:00 GMT", "a/b.png");
        assert_ne!(auth, delete);
    }

    #[tokio::test]
    async fn test_store_sends_signed_put() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/2026/03/07/a.png")
            .match_header("authorization", Matcher::Regex("^OSS oss-key:".to_string()))
            .match_header("date", Matcher::Any)
            .with_status(200)
            .create_async()
            .await;

        let store = OssStore::new(test_config(Some(server.url()))).unwrap();
        store
            .store("2026/03/07/a.png", "image/png", Bytes::from_static(b"x"))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_absent_object_is_success() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/a/b.png")
            .with_status(404)
            .create_async()
            .await;

        let store = OssStore::new(test_config(Some(server.url()))).unwrap();
        assert!(store.delete("a/b.png").await.is_ok());
    }

    #[tokio::test]
    async fn test_usage_is_unknown_sentinel() {
        let store = OssStore::new(test_config(None)).unwrap();
        assert!(store.usage().await.unwrap().is_unknown());
    }
}
