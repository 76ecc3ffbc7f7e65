//! Client side of the `/sync` wire contract

use crate::config::SyncClientConfig;
use crate::error::{AppError, Result};
use crate::sync::{PushBody, SyncId, SyncRecord};
use crate::watchlist::WatchlistRow;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

/// How the sync client reaches the server
#[async_trait]
pub trait SyncTransport: Send + Sync {
    /// `GET /sync?id=..`
    async fn fetch(&self, id: &SyncId) -> Result<SyncRecord>;

    /// `PUT /sync?id=..` with the full row list. Returns the server stamp
    /// of the write when the server reports it.
    async fn push(&self, id: &SyncId, rows: &[WatchlistRow]) -> Result<Option<u64>>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PushReply {
    ok: bool,
    #[serde(rename = "updatedAt", default)]
    updated_at: Option<u64>,
}

/// `reqwest` implementation
pub struct HttpSyncTransport {
    client: Client,
    endpoint: String,
}

impl HttpSyncTransport {
    pub fn new(config: &SyncClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.sync_endpoint(),
        })
    }

    /// Map a non-2xx reply to the error taxonomy
    async fn error_from(response: reqwest::Response) -> AppError {
        let status = response.status();
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|b| b.error)
            .unwrap_or_else(|| status.to_string());

        match status {
            StatusCode::BAD_REQUEST => AppError::Validation(message),
            StatusCode::NOT_IMPLEMENTED => AppError::NotConfigured(message),
            _ => AppError::Remote {
                status: status.as_u16(),
                message,
            },
        }
    }
}

#[async_trait]
impl SyncTransport for HttpSyncTransport {
    async fn fetch(&self, id: &SyncId) -> Result<SyncRecord> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("id", id.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn push(&self, id: &SyncId, rows: &[WatchlistRow]) -> Result<Option<u64>> {
        let response = self
            .client
            .put(&self.endpoint)
            .query(&[("id", id.as_str())])
            .json(&PushBody { rows: rows.to_vec() })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let body = response.bytes().await?;
        let reply: PushReply = serde_json::from_slice(&body)?;
        if !reply.ok {
            return Err(AppError::Remote {
                status: 200,
                message: "push not acknowledged".to_string(),
            });
        }
        Ok(reply.updated_at)
    }
}
