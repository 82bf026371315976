//! HTTP retrieval of the realtime feed.
//!
//! Failures (network errors, non-success status) are returned to the caller;
//! nothing here retries. A poller that gets an error keeps its last good
//! snapshot and tries again on its next tick.

mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result};
use bytes::Bytes;

/// Whether a feed source names an HTTP(S) endpoint rather than a local file.
pub fn is_http_url(source: &str) -> bool {
    let lower = source.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// The client used for every poll: plain, or appending `api_key` as the
/// `param_name` query parameter.
pub fn feed_client(param_name: &str, api_key: Option<&str>) -> Result<Box<dyn HttpClient>> {
    let client = BasicClient::new()?;
    Ok(match api_key {
        Some(key) => Box::new(auth::UrlParam {
            inner: client,
            param_name: param_name.to_string(),
            key: key.to_string(),
        }),
        None => Box::new(client),
    })
}

pub async fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Bytes> {
    let req = reqwest::Request::new(
        reqwest::Method::GET,
        url.parse().with_context(|| format!("invalid feed URL {url:?}"))?,
    );

    let resp = client
        .execute(req)
        .await
        .context("feed request failed")?
        .error_for_status()
        .context("feed request rejected")?;
    Ok(resp.bytes().await?)
}
