//! sheetbase-http: async HTTP transport
//!
//! Thin wrapper over a pooled `reqwest` client used by the spreadsheet store
//! client for both the token endpoint and the values API.
//!
//! # Architecture
//!
//! - `HttpClient`: connection-pooled async HTTP client
//! - `RequestBuilder`: request builder with query, body and bearer auth
//! - `HttpResponse`: buffered response with latency measurement

pub mod client;
pub mod config;
pub mod error;
pub mod request;
pub mod response;

pub use client::HttpClient;
pub use config::HttpClientConfig;
pub use error::{HttpError, HttpResult};
pub use request::{Auth, RequestBody, RequestBuilder};
pub use response::HttpResponse;

pub use sheetbase_common::http::{HttpMethod, HttpResponseLike, HttpStatus};
