//! Upstash / Vercel KV compatible REST store
//!
//! `GET  {base}/get/{key}` answers `{"result": "<value>" | null}`.
//! `POST {base}/set/{key}` with the raw value as body answers `{"result": "OK"}`.
//! Failures answer a non-2xx status and/or `{"error": "..."}`.

use crate::error::{AppError, Result};
use crate::kv::KvStore;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;
use url::Url;

#[derive(Debug, Deserialize)]
struct RestReply {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub struct RestKvStore {
    client: Client,
    base_url: String,
    token: String,
}

impl RestKvStore {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| AppError::Config(format!("Invalid KV REST URL '{}': {}", base_url, e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn command_url(&self, command: &str, key: &str) -> String {
        format!("{}/{}/{}", self.base_url, command, urlencoding::encode(key))
    }

    async fn read_reply(response: reqwest::Response) -> Result<RestReply> {
        let status = response.status();
        let body = response.text().await?;

        let reply: Option<RestReply> = serde_json::from_str(&body).ok();

        if !status.is_success() {
            let message = reply
                .and_then(|r| r.error)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            warn!("KV REST call failed: {}", message);
            return Err(AppError::Store(message));
        }

        let reply = reply.ok_or_else(|| AppError::Store("Malformed KV REST reply".to_string()))?;
        if let Some(error) = reply.error {
            return Err(AppError::Store(error));
        }
        Ok(reply)
    }
}

#[async_trait]
impl KvStore for RestKvStore {
    fn name(&self) -> &'static str {
        "rest"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(self.command_url("get", key))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| AppError::Store(format!("KV GET {}: {}", key, e)))?;

        Ok(Self::read_reply(response).await?.result)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let response = self
            .client
            .post(self.command_url("set", key))
            .bearer_auth(&self.token)
            .body(value.to_string())
            .send()
            .await
            .map_err(|e| AppError::Store(format!("KV SET {}: {}", key, e)))?;

        Self::read_reply(response).await?;
        Ok(())
    }
}
