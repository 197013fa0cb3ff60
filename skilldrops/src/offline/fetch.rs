//! Network side of the offline cache layer.

use reqwest::header::CONTENT_TYPE;
use std::future::Future;

use super::storage::CachedResponse;
use super::CacheError;

/// Fetch a resource path from the network. The trait seam keeps the cache
/// policy testable without a server.
pub trait Fetch: Send + Sync {
    fn fetch(
        &self,
        path: &str,
    ) -> impl Future<Output = Result<CachedResponse, CacheError>> + Send;
}

/// HTTP fetcher resolving resource paths against a fixed origin.
#[derive(Clone)]
pub struct HttpFetcher {
    origin: String,
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(origin: impl Into<String>) -> Self {
        let origin = origin.into().trim_end_matches('/').to_string();
        Self {
            origin,
            client: reqwest::Client::new(),
        }
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, path: &str) -> Result<CachedResponse, CacheError> {
        let url = format!("{}{}", self.origin, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CacheError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        // A redirect off our origin makes the response opaque to us.
        let basic = response.url().as_str().starts_with(&self.origin);
        let body = response
            .bytes()
            .await
            .map_err(|e| CacheError::Network(e.to_string()))?
            .to_vec();

        Ok(CachedResponse {
            status,
            content_type,
            body,
            basic,
        })
    }
}
