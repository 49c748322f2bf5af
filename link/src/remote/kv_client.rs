//! HTTP client for the instances key/value worker.

use async_trait::async_trait;
use log::{debug, warn};
use std::time::Instant;
use url::Url;

use super::RemoteStore;
use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::models::{RemoteSnapshot, StateDump};

/// Remote store speaking the key/value worker protocol:
///
/// - `POST <base>` with the JSON record returns the id as plain text
/// - `GET <base>/<id>` returns the JSON record
#[derive(Debug, Clone)]
pub struct KvClient {
    base_url: Url,
    http_client: reqwest::Client,
}

impl KvClient {
    /// Create a client for the worker at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self::with_http_client(Url::parse(base_url)?, reqwest::Client::new()))
    }

    pub fn from_config(config: &LinkConfig) -> Result<Self> {
        Self::new(&config.kv_url)
    }

    /// Reuse an existing `reqwest::Client` (connection pool, proxies, ...).
    pub fn with_http_client(base_url: Url, http_client: reqwest::Client) -> Self {
        Self {
            base_url,
            http_client,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `<base>/<id>` with the id percent-encoded as a single path segment.
    fn record_url(&self, id: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                LinkError::ConfigurationError(format!(
                    "kv_url '{}' cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }
}

#[async_trait]
impl RemoteStore for KvClient {
    async fn write(&self, dump: &StateDump) -> Result<String> {
        let body = serde_json::to_string(dump)?;
        let start = Instant::now();
        debug!(
            "[KV_HTTP] Sending POST to {} (path={} bytes={})",
            self.base_url,
            dump.path,
            body.len()
        );

        let response = self
            .http_client
            .post(self.base_url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(
                "[KV_HTTP] Write failed: status={} body=\"{}\" duration_ms={}",
                status,
                text,
                start.elapsed().as_millis()
            );
            return Err(LinkError::RemoteWriteFailed {
                status: status.as_u16(),
                body: text,
            });
        }

        let text = response.text().await?;
        let id = text.trim();
        let duration_ms = start.elapsed().as_millis();
        if id.is_empty() {
            warn!("[KV_HTTP] Write returned no id: status={} duration_ms={}", status, duration_ms);
            return Err(LinkError::RemoteWriteFailed {
                status: status.as_u16(),
                body: "empty id in response".to_string(),
            });
        }

        debug!("[KV_HTTP] Write stored as id={} duration_ms={}", id, duration_ms);
        Ok(id.to_string())
    }

    async fn read(&self, id: &str) -> Result<RemoteSnapshot> {
        let url = self.record_url(id)?;
        let start = Instant::now();
        debug!("[KV_HTTP] Sending GET to {}", url);

        let response = self.http_client.get(url).send().await?;
        let status = response.status();
        let duration_ms = start.elapsed().as_millis();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(
                "[KV_HTTP] Read of id={} failed: status={} body=\"{}\" duration_ms={}",
                id, status, text, duration_ms
            );
            return Err(LinkError::RemoteReadFailed {
                id: id.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        let value: serde_json::Value = response.json().await?;
        debug!("[KV_HTTP] Read id={} duration_ms={}", id, duration_ms);
        RemoteSnapshot::from_json(value)
    }
}
