use async_trait::async_trait;
use reqwest::{Request, Response};

/// Seam for anything that can execute an HTTP request, so auth wrappers can
/// be layered over a base client.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
