//! Graph upload sessions for large OneDrive files.
//!
//! A session is a pre-authenticated upload URL; chunks go up sequentially with
//! `Content-Range` headers. Graph answers 202 while it expects more ranges and
//! 200/201 when the final chunk lands.

use serde::Deserialize;

use crate::traits::{StoreError, StoreResult};

/// Graph requires chunk sizes in multiples of 320 KiB.
pub const CHUNK_SIZE: usize = 320 * 1024;

#[derive(Deserialize)]
struct SessionResponse {
    #[serde(rename = "uploadUrl")]
    upload_url: String,
}

#[derive(Debug, Deserialize)]
pub struct DriveItem {
    pub id: String,
    pub size: u64,
}

/// Outcome of a single chunk transfer.
#[derive(Debug)]
pub enum ChunkOutcome {
    /// Graph accepted the range and expects more, starting at `next_offset`.
    Accepted { next_offset: u64 },
    /// Final chunk landed; the item now exists.
    Complete(DriveItem),
    /// Unrecoverable response; the session must be aborted.
    Fatal { status: u16, message: String },
}

/// An open upload session against a pre-authenticated Graph URL.
pub struct UploadSession {
    http: reqwest::Client,
    upload_url: String,
    total: u64,
}

impl UploadSession {
    /// Open a session by POSTing to the item's `createUploadSession` URL.
    pub async fn open(
        http: reqwest::Client,
        create_url: &str,
        access_token: &str,
        total: u64,
    ) -> StoreResult<Self> {
        let response = http
            .post(create_url)
            .bearer_auth(access_token)
            .json(&serde_json::json!({
                "item": { "@microsoft.graph.conflictBehavior": "replace" }
            }))
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 {
            return Err(StoreError::AuthExpired(
                "upload session rejected access token".to_string(),
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::from_status(
                status.as_u16(),
                format!("OneDrive session open failed: {}", body),
            ));
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| StoreError::network(format!("OneDrive session response: {}", e)))?;

        Ok(UploadSession {
            http,
            upload_url: session.upload_url,
            total,
        })
    }

    /// Send one chunk starting at `offset`. The session URL is itself the
    /// credential; no bearer token goes on chunk requests.
    pub async fn write_chunk(&self, offset: u64, chunk: &[u8]) -> StoreResult<ChunkOutcome> {
        let end = offset + chunk.len() as u64;
        let content_range = format!("bytes {}-{}/{}", offset, end - 1, self.total);

        let response = self
            .http
            .put(&self.upload_url)
            .header("Content-Range", content_range)
            .header("Content-Length", chunk.len())
            .body(chunk.to_vec())
            .send()
            .await?;

        let status = response.status().as_u16();
        match status {
            202 => Ok(ChunkOutcome::Accepted { next_offset: end }),
            200 | 201 => {
                let item: DriveItem = response.json().await.map_err(|e| {
                    StoreError::network(format!("OneDrive item response: {}", e))
                })?;
                Ok(ChunkOutcome::Complete(item))
            }
            _ => {
                let message = response.text().await.unwrap_or_default();
                Ok(ChunkOutcome::Fatal { status, message })
            }
        }
    }

    /// Abort the session. Best effort: an expired session is already gone.
    pub async fn abort(&self) {
        if let Err(err) = self.http.delete(&self.upload_url).send().await {
            tracing::warn!(error = %err, "Failed to abort OneDrive upload session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_extracts_upload_url() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/createUploadSession")
            .match_header("authorization", "Bearer tok")
            .with_status(200)
            .with_body(format!(
                r#"{{"uploadUrl": "{}/upload-target"}}"#,
                server.url()
            ))
            .create_async()
            .await;

        let url = format!("{}/createUploadSession", server.url());
        let session = UploadSession::open(reqwest::Client::new(), &url, "tok", 1000)
            .await
            .unwrap();
        assert!(session.upload_url.ends_with("/upload-target"));
    }

    #[tokio::test]
    async fn test_chunk_outcomes() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", "/up")
            .match_header("content-range", "bytes 0-9/30")
            .with_status(202)
            .with_body(r#"{"nextExpectedRanges": ["10-"]}"#)
            .create_async()
            .await;
        server
            .mock("PUT", "/up")
            .match_header("content-range", "bytes 10-29/30")
            .with_status(201)
            .with_body(r#"{"id": "item1", "size": 30}"#)
            .create_async()
            .await;

        let session = UploadSession {
            http: reqwest::Client::new(),
            upload_url: format!("{}/up", server.url()),
            total: 30,
        };

        let first = session.write_chunk(0, &[0u8; 10]).await.unwrap();
        let next = match first {
            ChunkOutcome::Accepted { next_offset } => next_offset,
            other => panic!("expected Accepted, got {:?}", other),
        };
        assert_eq!(next, 10);

        let last = session.write_chunk(next, &[0u8; 20]).await.unwrap();
        match last {
            ChunkOutcome::Complete(item) => assert_eq!(item.size, 30),
            other => panic!("expected Complete, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fatal_chunk_reports_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", "/up")
            .with_status(416)
            .with_body("range mismatch")
            .create_async()
            .await;

        let session = UploadSession {
            http: reqwest::Client::new(),
            upload_url: format!("{}/up", server.url()),
            total: 10,
        };

        match session.write_chunk(0, &[0u8; 10]).await.unwrap() {
            ChunkOutcome::Fatal { status, .. } => assert_eq!(status, 416),
            other => panic!("expected Fatal, got {:?}", other),
        }
    }
}
