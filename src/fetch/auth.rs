use super::client::HttpClient;
use async_trait::async_trait;

/// An [`HttpClient`] wrapper that appends an API key as a URL query
/// parameter, the scheme the 511.org transit API uses (`?api_key=...`).
pub struct UrlParamKey<C> {
    pub inner: C,
    pub param_name: String,
    pub key: String,
}

impl<C> UrlParamKey<C> {
    /// Convenience constructor for the 511 `api_key` parameter.
    pub fn api_key(inner: C, key: String) -> Self {
        Self {
            inner,
            param_name: "api_key".to_string(),
            key,
        }
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for UrlParamKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.url_mut()
            .query_pairs_mut()
            .append_pair(&self.param_name, &self.key);
        self.inner.execute(req).await
    }
}
