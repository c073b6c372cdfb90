use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use super::{HttpClient, fetch_bytes};

/// Supplies raw feed bytes for an endpoint.
///
/// The realtime pipeline only sees this trait; tests substitute in-memory
/// sources.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, endpoint: &str) -> Result<Vec<u8>>;
}

/// Fetches `http(s)` endpoints through an [`HttpClient`] and reads any other
/// endpoint as a local file path (handy for replaying captured feeds).
pub struct HttpFeedSource<C> {
    client: C,
}

impl<C: HttpClient> HttpFeedSource<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C: HttpClient> FeedSource for HttpFeedSource<C> {
    async fn fetch(&self, endpoint: &str) -> Result<Vec<u8>> {
        let bytes = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            fetch_bytes(&self.client, endpoint).await?
        } else {
            tokio::fs::read(endpoint)
                .await
                .with_context(|| format!("failed to read feed file {endpoint}"))?
        };
        debug!(endpoint, bytes = bytes.len(), "Feed bytes received");
        Ok(bytes)
    }
}
