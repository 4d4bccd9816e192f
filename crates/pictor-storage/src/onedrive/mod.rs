//! OneDrive backend over the Microsoft Graph API.
//!
//! Tokens are short-lived: every operation goes through [`OnedriveStore::access_token`],
//! which refreshes proactively inside a five-minute window before expiry. The
//! token state sits behind a mutex held across the refresh round trip, so
//! concurrent operations trigger exactly one refresh and the rest wait for it.
//!
//! Files at or under 4 MiB go up in a single `PUT :/content`; larger files use
//! an upload session with 320 KiB chunks (see [`session`]).

mod session;

pub use session::{ChunkOutcome, UploadSession, CHUNK_SIZE};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use pictor_core::models::{OnedriveConfig, OnedriveRegion};
use pictor_core::StrategyKind;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::paths::validate_path;
use crate::traits::{ObjectStore, StorageUsage, StoreError, StoreResult, StoredObject};

/// Single-request upload ceiling; anything larger goes through a session.
const SMALL_UPLOAD_THRESHOLD: usize = 4 * 1024 * 1024;

/// Refresh this long before the access token actually expires.
const REFRESH_WINDOW_MS: i64 = 5 * 60 * 1000;

const GLOBAL_GRAPH: &str = "https://graph.microsoft.com/v1.0";
const CHINA_GRAPH: &str = "https://microsoftgraph.chinacloudapi.cn/v1.0";
const GLOBAL_LOGIN: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/token";
const CHINA_LOGIN: &str = "https://login.chinacloudapi.cn/common/oauth2/v2.0/token";

/// The live OAuth token set for a OneDrive strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OauthTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Absolute expiry, unix millis.
    pub expires_at_ms: i64,
}

/// Where a token sits in its lifecycle relative to expiry. A refresh in
/// flight is not a state of its own: it is represented by the held token
/// mutex, which concurrent callers queue behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenState {
    /// Comfortably inside its lifetime; use as-is.
    Valid,
    /// Expires within [`REFRESH_WINDOW_MS`]; refresh proactively.
    NearExpiry,
    /// Past expiry; refresh before any use.
    Expired,
}

fn token_state(expires_at_ms: i64, now_ms: i64) -> TokenState {
    if expires_at_ms <= now_ms {
        TokenState::Expired
    } else if expires_at_ms - now_ms <= REFRESH_WINDOW_MS {
        TokenState::NearExpiry
    } else {
        TokenState::Valid
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Microsoft rotates refresh tokens; absent means keep the old one.
    refresh_token: Option<String>,
    expires_in: i64,
}

#[derive(Deserialize)]
struct DriveQuota {
    used: u64,
    total: u64,
}

#[derive(Deserialize)]
struct DriveResponse {
    quota: DriveQuota,
}

#[derive(Deserialize)]
struct ItemResponse {
    #[serde(rename = "@microsoft.graph.downloadUrl")]
    download_url: Option<String>,
}

/// Exchange an authorization code for tokens. Used once when an operator
/// connects a OneDrive account; subsequent refreshes happen inside the store.
pub async fn exchange_code(
    http: &reqwest::Client,
    login_endpoint: &str,
    client_id: &str,
    client_secret: &str,
    code: &str,
    redirect_uri: &str,
) -> StoreResult<OauthTokens> {
    let response = http
        .post(login_endpoint)
        .form(&[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(StoreError::AuthExpired(format!(
            "authorization code exchange failed ({}): {}",
            status, body
        )));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| StoreError::network(format!("token response: {}", e)))?;

    let refresh_token = token.refresh_token.ok_or_else(|| {
        StoreError::AuthExpired("token response carried no refresh token".to_string())
    })?;

    Ok(OauthTokens {
        access_token: token.access_token,
        refresh_token,
        expires_at_ms: Utc::now().timestamp_millis() + token.expires_in * 1000,
    })
}

/// Default login token endpoint for a region.
pub fn login_endpoint_for(region: OnedriveRegion) -> &'static str {
    match region {
        OnedriveRegion::Global => GLOBAL_LOGIN,
        OnedriveRegion::China => CHINA_LOGIN,
    }
}

/// OneDrive storage implementation
pub struct OnedriveStore {
    client_id: String,
    client_secret: String,
    folder: String,
    graph_endpoint: String,
    login_endpoint: String,
    tokens: Mutex<OauthTokens>,
    http: reqwest::Client,
}

impl OnedriveStore {
    pub fn new(config: OnedriveConfig) -> StoreResult<Self> {
        if config.client_id.is_empty() || config.client_secret.is_empty() {
            return Err(StoreError::Config(
                "OneDrive client credentials are not configured".to_string(),
            ));
        }
        if config.refresh_token.is_empty() {
            return Err(StoreError::Config(
                "OneDrive account is not connected (no refresh token)".to_string(),
            ));
        }

        let graph_endpoint = config.graph_endpoint.clone().unwrap_or_else(|| {
            match config.region {
                OnedriveRegion::Global => GLOBAL_GRAPH,
                OnedriveRegion::China => CHINA_GRAPH,
            }
            .to_string()
        });
        let login_endpoint = config
            .login_endpoint
            .clone()
            .unwrap_or_else(|| login_endpoint_for(config.region).to_string());

        let mut folder = config.folder.trim_end_matches('/').to_string();
        if !folder.starts_with('/') {
            folder.insert(0, '/');
        }

        Ok(OnedriveStore {
            client_id: config.client_id,
            client_secret: config.client_secret,
            folder,
            graph_endpoint,
            login_endpoint,
            tokens: Mutex::new(OauthTokens {
                access_token: config.access_token,
                refresh_token: config.refresh_token,
                expires_at_ms: config.expires_at_ms,
            }),
            http: reqwest::Client::new(),
        })
    }

    /// Snapshot of the current token set, for persisting rotated tokens.
    pub async fn tokens_snapshot(&self) -> OauthTokens {
        self.tokens.lock().await.clone()
    }

    fn item_url(&self, path: &str, suffix: &str) -> String {
        format!(
            "{}/me/drive/root:{}/{}{}",
            self.graph_endpoint, self.folder, path, suffix
        )
    }

    /// Current access token, refreshing if it expires within the window.
    ///
    /// The mutex stays held across the refresh request: concurrent callers
    /// queue behind it and observe the already-refreshed state, so only one
    /// refresh hits the token endpoint.
    async fn access_token(&self) -> StoreResult<String> {
        let mut tokens = self.tokens.lock().await;

        let now_ms = Utc::now().timestamp_millis();
        if token_state(tokens.expires_at_ms, now_ms) == TokenState::Valid {
            return Ok(tokens.access_token.clone());
        }

        tracing::debug!("Refreshing OneDrive access token");

        let response = self
            .http
            .post(&self.login_endpoint)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", tokens.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 400 || status.as_u16() == 401 {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::AuthExpired(format!(
                "refresh token rejected: {}",
                body
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::from_status(
                status.as_u16(),
                format!("OneDrive token refresh failed: {}", body),
            ));
        }

        let refreshed: TokenResponse = response
            .json()
            .await
            .map_err(|e| StoreError::network(format!("token response: {}", e)))?;

        tokens.access_token = refreshed.access_token;
        if let Some(rotated) = refreshed.refresh_token {
            tokens.refresh_token = rotated;
        }
        tokens.expires_at_ms = Utc::now().timestamp_millis() + refreshed.expires_in * 1000;

        Ok(tokens.access_token.clone())
    }

    async fn store_small(
        &self,
        path: &str,
        content_type: &str,
        data: Bytes,
    ) -> StoreResult<StoredObject> {
        let size = data.len() as u64;
        let token = self.access_token().await?;

        let response = self
            .http
            .put(self.item_url(path, ":/content"))
            .bearer_auth(token)
            .header("Content-Type", content_type)
            .body(data)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 {
            return Err(StoreError::AuthExpired(
                "Graph rejected access token".to_string(),
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::from_status(
                status.as_u16(),
                format!("OneDrive upload failed: {}", body),
            ));
        }

        Ok(StoredObject {
            path: path.to_string(),
            size,
        })
    }

    async fn store_chunked(&self, path: &str, data: Bytes) -> StoreResult<StoredObject> {
        let total = data.len() as u64;
        let token = self.access_token().await?;
        let create_url = self.item_url(path, ":/createUploadSession");
        let session = UploadSession::open(self.http.clone(), &create_url, &token, total).await?;

        let mut offset: u64 = 0;
        while offset < total {
            let end = usize::min(offset as usize + CHUNK_SIZE, data.len());
            let outcome = session.write_chunk(offset, &data[offset as usize..end]).await?;
            match outcome {
                ChunkOutcome::Accepted { next_offset } => offset = next_offset,
                ChunkOutcome::Complete(item) => {
                    tracing::info!(
                        path = %path,
                        item_id = %item.id,
                        size_bytes = item.size,
                        "OneDrive chunked upload complete"
                    );
                    return Ok(StoredObject {
                        path: path.to_string(),
                        size: item.size,
                    });
                }
                ChunkOutcome::Fatal { status, message } => {
                    session.abort().await;
                    return Err(StoreError::from_status(
                        status,
                        format!("OneDrive chunk rejected: {}", message),
                    ));
                }
            }
        }

        // All ranges accepted but Graph never returned the item.
        session.abort().await;
        Err(StoreError::network(
            "OneDrive session ended without completion".to_string(),
        ))
    }
}

#[async_trait]
impl ObjectStore for OnedriveStore {
    async fn store(
        &self,
        path: &str,
        content_type: &str,
        data: Bytes,
    ) -> StoreResult<StoredObject> {
        validate_path(path)?;

        let stored = if data.len() <= SMALL_UPLOAD_THRESHOLD {
            self.store_small(path, content_type, data).await?
        } else {
            self.store_chunked(path, data).await?
        };

        tracing::info!(
            path = %path,
            size_bytes = stored.size,
            "OneDrive upload successful"
        );
        Ok(stored)
    }

    async fn delete(&self, path: &str) -> StoreResult<()> {
        validate_path(path)?;

        let token = self.access_token().await?;
        let response = self
            .http
            .delete(self.item_url(path, ""))
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        match status.as_u16() {
            204 | 404 => {}
            401 => {
                return Err(StoreError::AuthExpired(
                    "Graph rejected access token".to_string(),
                ))
            }
            code => {
                let body = response.text().await.unwrap_or_default();
                return Err(StoreError::from_status(
                    code,
                    format!("OneDrive delete failed: {}", body),
                ));
            }
        }

        tracing::info!(path = %path, "OneDrive delete successful");
        Ok(())
    }

    /// Resolution needs Graph: the download URL is pre-authenticated and
    /// short-lived, so it is fetched per request rather than stored.
    async fn resolve_url(&self, path: &str) -> StoreResult<String> {
        validate_path(path)?;

        let token = self.access_token().await?;
        let response = self
            .http
            .get(self.item_url(path, ""))
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 {
            return Err(StoreError::AuthExpired(
                "Graph rejected access token".to_string(),
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::from_status(
                status.as_u16(),
                format!("OneDrive item lookup failed: {}", body),
            ));
        }

        let item: ItemResponse = response
            .json()
            .await
            .map_err(|e| StoreError::network(format!("OneDrive item response: {}", e)))?;

        item.download_url.ok_or_else(|| {
            StoreError::network("OneDrive item carried no download URL".to_string())
        })
    }

    async fn usage(&self) -> StoreResult<StorageUsage> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(format!("{}/me/drive", self.graph_endpoint))
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::from_status(
                status.as_u16(),
                format!("OneDrive drive lookup failed: {}", body),
            ));
        }

        let drive: DriveResponse = response
            .json()
            .await
            .map_err(|e| StoreError::network(format!("OneDrive drive response: {}", e)))?;

        Ok(StorageUsage::new(drive.quota.used, drive.quota.total))
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Onedrive
    }
}
