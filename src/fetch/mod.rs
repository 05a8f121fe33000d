//! Loading input documents from local files or HTTP(S) endpoints.

mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result, bail};
use auth::ApiKey;
use tracing::debug;

/// Sends a GET for `url` through `client` and returns the body.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?;
    let status = resp.status();
    if !status.is_success() {
        bail!("GET {url} returned status {status}");
    }
    Ok(resp.bytes().await?.to_vec())
}

/// Loads `source` from a local path, or fetches it when it looks like a URL.
///
/// With `api_key` set, HTTP requests carry `Authorization: Bearer <key>`.
#[tracing::instrument(skip(api_key), fields(authenticated = api_key.is_some()))]
pub async fn load_source(source: &str, api_key: Option<&str>) -> Result<Vec<u8>> {
    let bytes = if source.starts_with("http://") || source.starts_with("https://") {
        let client = BasicClient::new()?;
        match api_key {
            Some(key) => fetch_bytes(&ApiKey::bearer(client, key)?, source).await?,
            None => fetch_bytes(&client, source).await?,
        }
    } else {
        tokio::fs::read(source)
            .await
            .with_context(|| format!("Failed to read '{source}'"))?
    };
    debug!(bytes = bytes.len(), "Source loaded");
    Ok(bytes)
}
