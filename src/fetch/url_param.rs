use crate::fetch::client::HttpClient;
use async_trait::async_trait;

/// An [`HttpClient`] wrapper that appends an API key as a URL query parameter.
///
/// The Census Data API takes its key as `key=<value>`; requests without one
/// still work but are rate limited.
pub struct UrlParam<C> {
    pub inner: C,
    pub param_name: String,
    pub key: String,
}

impl<C> UrlParam<C> {
    /// Wraps `inner` so every request carries `key=<key>`.
    pub fn census_key(inner: C, key: String) -> Self {
        Self {
            inner,
            param_name: "key".to_string(),
            key,
        }
    }

    /// Applies the parameter to a URL without sending anything.
    pub fn decorate(&self, url: &mut reqwest::Url) {
        url.query_pairs_mut().append_pair(&self.param_name, &self.key);
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for UrlParam<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.decorate(req.url_mut());
        self.inner.execute(req).await
    }
}
