//! HTTP client with connection pooling and async operations

use crate::config::HttpClientConfig;
use crate::error::HttpResult;
use crate::request::RequestBuilder;
use crate::response::{from_reqwest, HttpResponse};
use sheetbase_common::http::HttpMethod;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Async HTTP client with connection pooling
///
/// # Example
///
/// ```ignore
/// use sheetbase_http::{HttpClient, HttpClientConfig, HttpMethod};
///
/// let client = HttpClient::new(
///     HttpClientConfig::new().base_url("https://sheets.googleapis.com"),
/// )?;
/// let response = client
///     .execute(client.request(HttpMethod::Get, "/v4/spreadsheets/abc").bearer_auth(token))
///     .await?;
/// ```
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<HttpClientInner>,
}

struct HttpClientInner {
    client: reqwest::Client,
    config: HttpClientConfig,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration
    pub fn new(config: HttpClientConfig) -> HttpResult<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(config.pool_idle_timeout)
            .user_agent(&config.user_agent)
            .gzip(config.gzip);

        // Danger: Accept invalid certificates (testing only)
        if config.danger_accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build()?;

        Ok(Self {
            inner: Arc::new(HttpClientInner { client, config }),
        })
    }

    /// Create a client with default configuration
    pub fn default_client() -> HttpResult<Self> {
        Self::new(HttpClientConfig::default())
    }

    /// Get the base URL
    pub fn base_url(&self) -> Option<&str> {
        self.inner.config.base_url.as_deref()
    }

    /// Execute a request builder.
    ///
    /// Non-2xx responses are returned as responses; callers decide how to map them.
    pub async fn execute(&self, builder: RequestBuilder) -> HttpResult<HttpResponse> {
        let method = builder.method;
        let start = Instant::now();

        let request = builder.build_reqwest(&self.inner.client, self.base_url())?;
        let response = request.send().await?;
        let latency_ms = start.elapsed().as_millis() as u64;

        let response = from_reqwest(response, latency_ms).await?;
        debug!(
            method = %method,
            status = response.status_code,
            latency_ms,
            "HTTP request complete"
        );
        Ok(response)
    }

    /// Create a request builder for more complex requests
    pub fn request(&self, method: HttpMethod, url: &str) -> RequestBuilder {
        RequestBuilder::new(method, url)
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.inner.config.base_url)
            .field("timeout", &self.inner.config.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let config = HttpClientConfig::new()
            .base_url("https://sheets.googleapis.com")
            .timeout_secs(30.0);

        let client = HttpClient::new(config).unwrap();
        assert_eq!(client.base_url(), Some("https://sheets.googleapis.com"));
    }

    #[test]
    fn test_default_client() {
        let client = HttpClient::default_client().unwrap();
        assert!(client.base_url().is_none());
    }

    #[test]
    fn test_request_builder() {
        let client = HttpClient::default_client().unwrap();
        let builder = client
            .request(HttpMethod::Post, "/token")
            .form(vec![("grant_type".to_string(), "x".to_string())]);

        assert_eq!(builder.method, HttpMethod::Post);
        assert_eq!(builder.url, "/token");
    }
}
