use async_trait::async_trait;
use log::{debug, warn};
use std::time::Instant;
use url::Url;

use super::decode::decode_shard;
use super::Row;
use crate::error::{LinkError, Result};

/// Fetches and decodes one shard. Each call is one outbound request and one
/// decoded result.
#[async_trait]
pub trait ShardFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Vec<Row>>;
}

/// Shard fetcher over HTTP.
#[derive(Debug, Clone, Default)]
pub struct HttpShardFetcher {
    http_client: reqwest::Client,
}

impl HttpShardFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_http_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl ShardFetcher for HttpShardFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<Row>> {
        let start = Instant::now();
        debug!("[PIPELINE] Fetching shard {}", url);

        let response = self.http_client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("[PIPELINE] Shard {} returned status={}", url, status);
            return Err(LinkError::NetworkError(format!(
                "GET {} returned {}",
                url, status
            )));
        }

        let bytes = response.bytes().await?;
        let rows = decode_shard(&bytes)?;
        debug!(
            "[PIPELINE] Shard {} decoded rows={} bytes={} duration_ms={}",
            url,
            rows.len(),
            bytes.len(),
            start.elapsed().as_millis()
        );
        Ok(rows)
    }
}
