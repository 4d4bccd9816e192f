//! GitHub repository-backed store.
//!
//! Objects are committed through the contents API: base64-encoded PUT to
//! create, sha-referenced DELETE to remove. Deletion first reads the current
//! blob sha; a 409 from GitHub means the branch moved underneath us and the
//! caller should retry the whole operation.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use pictor_core::models::GithubConfig;
use pictor_core::StrategyKind;
use serde::Deserialize;
use serde_json::json;

use crate::paths::validate_path;
use crate::traits::{ObjectStore, StorageUsage, StoreError, StoreResult, StoredObject};

const DEFAULT_API_ENDPOINT: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("pictor/", env!("CARGO_PKG_VERSION"));

/// Free-plan soft ceiling used for usage percentage reporting.
const GITHUB_CAPACITY_BYTES: u64 = 1024 * 1024 * 1024;

#[derive(Deserialize)]
struct ContentsResponse {
    sha: String,
}

#[derive(Deserialize)]
struct RepoResponse {
    /// Repository size in kilobytes, as reported by the API.
    size: u64,
}

/// GitHub contents API storage implementation
#[derive(Clone)]
pub struct GithubStore {
    config: GithubConfig,
    http: reqwest::Client,
}

impl GithubStore {
    pub fn new(config: GithubConfig) -> StoreResult<Self> {
        if config.token.is_empty() {
            return Err(StoreError::Config(
                "GitHub token is not configured".to_string(),
            ));
        }
        if config.owner.is_empty() || config.repo.is_empty() {
            return Err(StoreError::Config(
                "GitHub owner and repo must be configured".to_string(),
            ));
        }
        Ok(GithubStore {
            config,
            http: reqwest::Client::new(),
        })
    }

    fn api_base(&self) -> &str {
        self.config
            .api_endpoint
            .as_deref()
            .unwrap_or(DEFAULT_API_ENDPOINT)
    }

    /// Path inside the repository, under the configured prefix.
    fn repo_path(&self, path: &str) -> String {
        let prefix = self.config.path.trim_matches('/');
        if prefix.is_empty() {
            path.to_string()
        } else {
            format!("{}/{}", prefix, path)
        }
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base(),
            self.config.owner,
            self.config.repo,
            self.repo_path(path)
        )
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("Authorization", format!("Bearer {}", self.config.token))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
    }

    /// Fetch the blob sha for a path, or None if the file does not exist.
    async fn fetch_sha(&self, path: &str) -> StoreResult<Option<String>> {
        let url = format!("{}?ref={}", self.contents_url(path), self.config.branch);
        let response = self.request(self.http.get(url)).send().await?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::from_status(
                status.as_u16(),
                format!("GitHub contents lookup failed: {}", body),
            ));
        }

        let contents: ContentsResponse = response
            .json()
            .await
            .map_err(|e| StoreError::network(format!("GitHub contents response: {}", e)))?;
        Ok(Some(contents.sha))
    }
}

#[async_trait]
impl ObjectStore for GithubStore {
    async fn store(
        &self,
        path: &str,
        _content_type: &str,
        data: Bytes,
    ) -> StoreResult<StoredObject> {
        validate_path(path)?;

        let size = data.len() as u64;
        let body = json!({
            "message": format!("upload {}", path),
            "content": BASE64.encode(&data),
            "branch": self.config.branch,
        });

        let response = self
            .request(self.http.put(self.contents_url(path)))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        match status.as_u16() {
            200 | 201 => {}
            // The path exists with different bytes: a commit would need its sha.
            409 | 422 => return Err(StoreError::Conflict(path.to_string())),
            code => {
                let body = response.text().await.unwrap_or_default();
                return Err(StoreError::from_status(
                    code,
                    format!("GitHub upload failed: {}", body),
                ));
            }
        }

        tracing::info!(
            owner = %self.config.owner,
            repo = %self.config.repo,
            path = %path,
            size_bytes = size,
            "GitHub upload successful"
        );

        Ok(StoredObject {
            path: path.to_string(),
            size,
        })
    }

    async fn delete(&self, path: &str) -> StoreResult<()> {
        validate_path(path)?;

        let sha = match self.fetch_sha(path).await? {
            Some(sha) => sha,
            None => return Ok(()),
        };

        let body = json!({
            "message": format!("delete {}", path),
            "sha": sha,
            "branch": self.config.branch,
        });

        let response = self
            .request(self.http.delete(self.contents_url(path)))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        match status.as_u16() {
            200 | 404 => {}
            // Branch advanced between the sha read and this commit.
            409 => return Err(StoreError::Conflict(path.to_string())),
            code => {
                let body = response.text().await.unwrap_or_default();
                return Err(StoreError::from_status(
                    code,
                    format!("GitHub delete failed: {}", body),
                ));
            }
        }

        tracing::info!(
            owner = %self.config.owner,
            repo = %self.config.repo,
            path = %path,
            "GitHub delete successful"
        );
        Ok(())
    }

    async fn resolve_url(&self, path: &str) -> StoreResult<String> {
        validate_path(path)?;
        Ok(format!(
            "https://raw.githubusercontent.com/{}/{}/{}/{}",
            self.config.owner,
            self.config.repo,
            self.config.branch,
            self.repo_path(path)
        ))
    }

    async fn usage(&self) -> StoreResult<StorageUsage> {
        let url = format!(
            "{}/repos/{}/{}",
            self.api_base(),
            self.config.owner,
            self.config.repo
        );
        let response = self.request(self.http.get(url)).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::from_status(
                status.as_u16(),
                format!("GitHub repo lookup failed: {}", body),
            ));
        }

        let repo: RepoResponse = response
            .json()
            .await
            .map_err(|e| StoreError::network(format!("GitHub repo response: {}", e)))?;

        let used = (repo.size * 1024).min(GITHUB_CAPACITY_BYTES);
        Ok(StorageUsage::new(used, GITHUB_CAPACITY_BYTES))
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Github
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn test_config(endpoint: String) -> GithubConfig {
        GithubConfig {
            token: "ghp_test".to_string(),
            owner: "acme".to_string(),
            repo: "images".to_string(),
            branch: "main".to_string(),
            path: "uploads".to_string(),
            api_endpoint: Some(endpoint),
        }
    }

    #[test]
    fn test_missing_token_fails_fast() {
        let mut config = test_config("http://unused".to_string());
        config.token = String::new();
        assert!(matches!(
            GithubStore::new(config),
            Err(StoreError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_store_puts_base64_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/repos/acme/images/contents/uploads/2026/03/07/a.png")
            .match_header("authorization", "Bearer ghp_test")
            .match_body(Matcher::PartialJson(json!({
                "content": BASE64.encode(b"hello"),
                "branch": "main",
            })))
            .with_status(201)
            .with_body(r#"{"content": {"sha": "abc"}}"#)
            .create_async()
            .await;

        let store = GithubStore::new(test_config(server.url())).unwrap();
        let stored = store
            .store("2026/03/07/a.png", "image/png", Bytes::from_static(b"hello"))
            .await
            .unwrap();
        assert_eq!(stored.size, 5);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_store_conflict_when_path_occupied() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", "/repos/acme/images/contents/uploads/a.png")
            .with_status(422)
            .with_body(r#"{"message": "sha required"}"#)
            .create_async()
            .await;

        let store = GithubStore::new(test_config(server.url())).unwrap();
        let result = store
            .store("a.png", "image/png", Bytes::from_static(b"x"))
            .await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_delete_fetches_sha_then_commits() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/acme/images/contents/uploads/a.png")
            .match_query(Matcher::UrlEncoded("ref".to_string(), "main".to_string()))
            .with_status(200)
            .with_body(r#"{"sha": "blob-sha-1"}"#)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/repos/acme/images/contents/uploads/a.png")
            .match_body(Matcher::PartialJson(json!({"sha": "blob-sha-1"})))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let store = GithubStore::new(test_config(server.url())).unwrap();
        store.delete("a.png").await.unwrap();
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_absent_object_is_success() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/acme/images/contents/uploads/a.png")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let store = GithubStore::new(test_config(server.url())).unwrap();
        assert!(store.delete("a.png").await.is_ok());
    }

    #[tokio::test]
    async fn test_resolve_url_uses_raw_host() {
        let store = GithubStore::new(test_config("http://unused".to_string())).unwrap();
        let url = store.resolve_url("2026/03/07/a.png").await.unwrap();
        assert_eq!(
            url,
            "https://raw.githubusercontent.com/acme/images/main/uploads/2026/03/07/a.png"
        );
    }

    #[tokio::test]
    async fn test_usage_converts_kilobytes_and_caps() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/acme/images")
            .with_status(200)
            .with_body(r#"{"size": 2048}"#)
            .create_async()
            .await;

        let store = GithubStore::new(test_config(server.url())).unwrap();
        let usage = store.usage().await.unwrap();
        assert_eq!(usage.used, 2048 * 1024);
        assert_eq!(usage.total, GITHUB_CAPACITY_BYTES);
    }
}
