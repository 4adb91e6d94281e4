//! Request builder

use crate::error::{HttpError, HttpResult};
use sheetbase_common::http::HttpMethod;

/// Request body variants
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    None,
    Json(serde_json::Value),
    /// `application/x-www-form-urlencoded` pairs
    Form(Vec<(String, String)>),
}

/// Request authentication
#[derive(Clone, Default)]
pub enum Auth {
    #[default]
    None,
    Bearer(String),
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::None => f.write_str("None"),
            Auth::Bearer(_) => f.write_str("Bearer([REDACTED])"),
        }
    }
}

/// Builder for a single HTTP request
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    pub method: HttpMethod,
    pub url: String,
    pub query_params: Vec<(String, String)>,
    pub body: RequestBody,
    pub auth: Auth,
}

impl RequestBuilder {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query_params: Vec::new(),
            body: RequestBody::None,
            auth: Auth::None,
        }
    }

    /// Append a query parameter (repeated keys are kept)
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((key.into(), value.into()));
        self
    }

    pub fn json_value(mut self, value: serde_json::Value) -> Self {
        self.body = RequestBody::Json(value);
        self
    }

    /// Serialize `value` as the JSON body
    pub fn json<T: serde::Serialize>(self, value: &T) -> HttpResult<Self> {
        let value = serde_json::to_value(value).map_err(|e| HttpError::Json(e.to_string()))?;
        Ok(self.json_value(value))
    }

    pub fn form(mut self, pairs: Vec<(String, String)>) -> Self {
        self.body = RequestBody::Form(pairs);
        self
    }

    pub fn bearer_auth(mut self, token: impl Into<String>) -> Self {
        self.auth = Auth::Bearer(token.into());
        self
    }

    /// Resolve the target URL against an optional base URL.
    ///
    /// Absolute URLs are used as-is; relative paths are appended to the base.
    pub fn resolve_url(&self, base_url: Option<&str>) -> HttpResult<url::Url> {
        if self.url.starts_with("http://") || self.url.starts_with("https://") {
            return Ok(url::Url::parse(&self.url)?);
        }
        let base = base_url.ok_or_else(|| {
            HttpError::InvalidUrl(format!("relative URL '{}' without a base URL", self.url))
        })?;
        let joined = format!(
            "{}/{}",
            base.trim_end_matches('/'),
            self.url.trim_start_matches('/')
        );
        Ok(url::Url::parse(&joined)?)
    }

    pub(crate) fn build_reqwest(
        self,
        client: &reqwest::Client,
        base_url: Option<&str>,
    ) -> HttpResult<reqwest::RequestBuilder> {
        let url = self.resolve_url(base_url)?;
        let method = match self.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };

        let mut builder = client.request(method, url);
        if !self.query_params.is_empty() {
            builder = builder.query(&self.query_params);
        }
        builder = match self.body {
            RequestBody::None => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Form(pairs) => builder.form(&pairs),
        };
        if let Auth::Bearer(token) = self.auth {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }
}
