//! HTTP plumbing for the live position feed.

mod auth;
mod basic;
mod client;

pub use auth::UrlParamKey;
pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::Result;

/// Fetches a URL and returns the raw response body.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?;
    Ok(resp.bytes().await?.to_vec())
}
