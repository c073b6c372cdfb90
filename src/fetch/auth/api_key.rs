use crate::fetch::client::HttpClient;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};

/// An [`HttpClient`] wrapper that injects an API key as an HTTP header.
///
/// When `host` is set the header is only sent to that host, so a key meant
/// for one agency's feed endpoint never leaks to another agency.
pub struct ApiKey<C> {
    inner: C,
    header_name: HeaderName,
    key: HeaderValue,
    host: Option<String>,
}

impl<C> ApiKey<C> {
    /// Validates the header name and value up front.
    pub fn new(inner: C, header_name: &str, key: &str) -> Result<Self> {
        let header_name = HeaderName::from_bytes(header_name.as_bytes())?;
        let mut key = HeaderValue::from_str(key)?;
        key.set_sensitive(true);
        Ok(Self {
            inner,
            header_name,
            key,
            host: None,
        })
    }

    /// `x-api-key: <key>`, the header the MTA feed endpoint reads.
    pub fn x_api_key(inner: C, key: &str) -> Result<Self> {
        Self::new(inner, "x-api-key", key)
    }

    /// Restricts the header to requests for `host`.
    pub fn for_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    fn applies_to(&self, req: &reqwest::Request) -> bool {
        match &self.host {
            Some(host) => req.url().host_str() == Some(host.as_str()),
            None => true,
        }
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        if self.applies_to(&req) {
            req.headers_mut()
                .insert(self.header_name.clone(), self.key.clone());
        }
        self.inner.execute(req).await
    }
}
