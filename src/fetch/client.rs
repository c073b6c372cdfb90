use async_trait::async_trait;
use reqwest::{Request, Response};

/// Sends an HTTP request. Wrappers (see [`crate::fetch::auth`]) decorate the
/// request before delegating to an inner client.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
