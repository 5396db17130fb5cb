//! HTTP transport for the signaling API
//!
//! The repository only needs "POST this JSON to that path and give me the
//! body back", so that is all [`SignalingTransport`] asks for. Tests swap in
//! their own implementation or point [`HttpTransport`] at a mock server.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::config::SignalingConfig;
use crate::error::{SignalingError, SignalingResult};
use crate::payloads::ApiMessage;

/// Something that can POST a JSON body to a signaling endpoint
#[async_trait]
pub trait SignalingTransport: Send + Sync {
    /// POST `body` to `path` (relative to the base URL) and return the raw
    /// response text of a 2xx answer.
    async fn post_json(&self, path: &str, body: serde_json::Value) -> SignalingResult<String>;
}

/// `reqwest`-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    /// Build a transport honouring the configured base URL and timeout
    pub fn new(config: &SignalingConfig) -> SignalingResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| SignalingError::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url().clone(),
        })
    }

    fn endpoint(&self, path: &str) -> SignalingResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| SignalingError::config(format!("invalid endpoint '{}': {}", path, e)))
    }
}

#[async_trait]
impl SignalingTransport for HttpTransport {
    async fn post_json(&self, path: &str, body: serde_json::Value) -> SignalingResult<String> {
        let url = self.endpoint(path)?;
        debug!("POST {}", url);

        let response = self.client.post(url.clone()).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            return Ok(text);
        }

        let message = serde_json::from_str::<ApiMessage>(&text)
            .map(|m| m.message)
            .unwrap_or(text);
        warn!("POST {} failed with {}: {}", url, status, message);

        Err(SignalingError::Http {
            status: status.as_u16(),
            message,
        })
    }
}
