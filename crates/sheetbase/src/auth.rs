//! Access-token acquisition for the spreadsheet API.
//!
//! A service account proves its identity with a short-lived RS256 JWT
//! assertion, exchanged at the token endpoint for a bearer access token.
//! Tokens are cached until shortly before they expire.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sheetbase_common::{Result, SheetbaseError};
use sheetbase_http::{HttpClient, HttpMethod};
use tracing::{debug, instrument};

use crate::backend::api::remote_error;
use crate::config::ServiceAccountKey;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for each assertion (the endpoint's maximum).
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Cached tokens are refreshed this long before they expire.
const REFRESH_MARGIN_SECS: i64 = 60;

/// Source of bearer tokens for remote calls.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// A pre-issued token, used as-is.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken([REDACTED])")
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Exchanges signed service-account assertions for access tokens.
pub struct ServiceAccountTokenProvider {
    principal: String,
    key_id: Option<String>,
    scope: String,
    token_url: String,
    signing_key: EncodingKey,
    http: HttpClient,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenProvider {
    /// Fails with `Configuration` if the identity is incomplete or the key is not RSA PEM.
    pub fn new(
        key: &ServiceAccountKey,
        scopes: &[String],
        token_url: impl Into<String>,
        http: HttpClient,
    ) -> Result<Self> {
        key.validate()?;
        if scopes.is_empty() {
            return Err(SheetbaseError::Configuration(
                "at least one OAuth scope is required".to_string(),
            ));
        }
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            SheetbaseError::Configuration(format!("invalid service account private key: {}", e))
        })?;

        Ok(Self {
            principal: key.client_email.clone(),
            key_id: key.private_key_id.clone(),
            scope: scopes.join(" "),
            token_url: token_url.into(),
            signing_key,
            http,
            cached: Mutex::new(None),
        })
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }

    /// Sign a fresh assertion issued at `now`.
    pub(crate) fn sign_assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let claims = AssertionClaims {
            iss: self.principal.clone(),
            scope: self.scope.clone(),
            aud: self.token_url.clone(),
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key_id.clone();

        jsonwebtoken::encode(&header, &claims, &self.signing_key).map_err(|e| {
            SheetbaseError::Configuration(format!("failed to sign service account assertion: {}", e))
        })
    }

    fn cached_token(&self, now: DateTime<Utc>) -> Option<String> {
        let cached = self.cached.lock();
        cached
            .as_ref()
            .filter(|c| c.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now)
            .map(|c| c.token.clone())
    }

    #[instrument(skip(self), fields(principal = %self.principal))]
    async fn fetch_token(&self) -> Result<CachedToken> {
        let now = Utc::now();
        let assertion = self.sign_assertion(now)?;

        debug!("Requesting access token");
        let request = self.http.request(HttpMethod::Post, &self.token_url).form(vec![
            ("grant_type".to_string(), JWT_BEARER_GRANT.to_string()),
            ("assertion".to_string(), assertion),
        ]);
        let response = self.http.execute(request).await?;
        if !response.is_success() {
            return Err(remote_error(&response));
        }

        let body: TokenResponse = response.json_as()?;
        debug!(expires_in = body.expires_in, "Access token issued");
        Ok(CachedToken {
            token: body.access_token,
            expires_at: now + Duration::seconds(body.expires_in),
        })
    }
}

#[async_trait]
impl TokenProvider for ServiceAccountTokenProvider {
    async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.cached_token(Utc::now()) {
            return Ok(token);
        }
        let fresh = self.fetch_token().await?;
        let token = fresh.token.clone();
        *self.cached.lock() = Some(fresh);
        Ok(token)
    }
}

impl std::fmt::Debug for ServiceAccountTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountTokenProvider")
            .field("principal", &self.principal)
            .field("scope", &self.scope)
            .field("token_url", &self.token_url)
            .finish()
    }
}
