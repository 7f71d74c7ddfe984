mod basic;
mod client;
mod url_param;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use url_param::UrlParam;

use anyhow::Result;
use reqwest::StatusCode;

/// Issues a GET for `url` and returns the status with the full body.
///
/// Non-success statuses are not errors here; callers decide what a 204 or
/// 400 means for their scope.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<(StatusCode, Vec<u8>)> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?;
    let status = resp.status();
    Ok((status, resp.bytes().await?.to_vec()))
}
