//! HTTP response types

use crate::error::{HttpError, HttpResult};
use sheetbase_common::http::HttpResponseLike;
use std::collections::HashMap;
use std::time::Duration;

/// Buffered HTTP response with latency measurement
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status_code: u16,

    /// Response headers, names lower-cased
    pub headers: HashMap<String, String>,

    /// Response body
    pub body: bytes::Bytes,

    /// Request latency in milliseconds
    pub latency_ms: u64,

    /// Final URL
    pub url: String,
}

impl HttpResponse {
    /// Check if status is success (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Get body as text (UTF-8)
    pub fn text(&self) -> HttpResult<String> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| HttpError::ResponseError(format!("Invalid UTF-8 in response: {}", e)))
    }

    /// Get body as JSON
    pub fn json(&self) -> HttpResult<serde_json::Value> {
        serde_json::from_slice(&self.body)
            .map_err(|e| HttpError::Json(format!("Failed to parse JSON: {}", e)))
    }

    /// Get body as JSON and deserialize to type
    pub fn json_as<T: serde::de::DeserializeOwned>(&self) -> HttpResult<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| HttpError::Json(format!("Failed to deserialize JSON: {}", e)))
    }

    /// Get latency as Duration
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

impl HttpResponseLike for HttpResponse {
    fn status_code(&self) -> u16 {
        self.status_code
    }

    fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    fn body_bytes(&self) -> &[u8] {
        &self.body
    }
}

/// Builder for creating HttpResponse (used in tests and fakes)
#[derive(Debug)]
pub struct HttpResponseBuilder {
    status_code: u16,
    headers: HashMap<String, String>,
    body: Vec<u8>,
    latency_ms: u64,
    url: String,
}

impl HttpResponseBuilder {
    pub fn new() -> Self {
        Self {
            status_code: 200,
            headers: HashMap::new(),
            body: Vec::new(),
            latency_ms: 0,
            url: String::new(),
        }
    }

    pub fn status_code(mut self, code: u16) -> Self {
        self.status_code = code;
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_lowercase(), value.into());
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn build(self) -> HttpResponse {
        HttpResponse {
            status_code: self.status_code,
            headers: self.headers,
            body: bytes::Bytes::from(self.body),
            latency_ms: self.latency_ms,
            url: self.url,
        }
    }
}

impl Default for HttpResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert reqwest Response to HttpResponse
pub async fn from_reqwest(
    response: reqwest::Response,
    latency_ms: u64,
) -> HttpResult<HttpResponse> {
    let status_code = response.status().as_u16();
    let url = response.url().to_string();

    let mut headers = HashMap::new();
    for (name, value) in response.headers().iter() {
        if let Ok(v) = value.to_str() {
            headers.insert(name.as_str().to_lowercase(), v.to_string());
        }
    }

    let body = response.bytes().await?;

    Ok(HttpResponse {
        status_code,
        headers,
        body,
        latency_ms,
        url,
    })
}
