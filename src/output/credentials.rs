//! Warehouse credentials
//!
//! `GOOGLE_APPLICATION_CREDENTIALS` normally names a service-account key.
//! Access tokens are minted from it with the OAuth 2.0 JWT bearer grant and
//! cached until shortly before they expire. A file holding a ready-made
//! token (bare, or JSON with `access_token`) is used as-is and never refreshed.

use crate::output::traits::{SinkError, SinkResult};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::Path;

/// OAuth scope for BigQuery reads and writes
pub const BIGQUERY_SCOPE: &str = "https://www.googleapis.com/auth/bigquery";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for each assertion; the token endpoint caps it at one hour
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Tokens closer than this to expiry are refreshed before use
const REFRESH_MARGIN_SECS: i64 = 60;

/// Fields of a service-account key file used for the JWT grant
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

/// What the credentials file turned out to contain
#[derive(Debug, Clone)]
pub enum Credentials {
    /// A service-account key; tokens are minted and refreshed from it
    ServiceAccount(ServiceAccountKey),
    /// A pre-issued access token
    Token(String),
}

impl Credentials {
    /// Reads and classifies a credentials file
    ///
    /// # Returns
    ///
    /// * `Ok(Credentials::ServiceAccount)` - JSON key with `"type": "service_account"` or a `private_key`
    /// * `Ok(Credentials::Token)` - A bare token or JSON with `access_token`
    /// * `Err(SinkError::Credentials)` - Unreadable, malformed or holding neither
    pub fn from_file(path: &Path) -> SinkResult<Self> {
        let unusable = |reason: String| SinkError::Credentials(format!("{}: {}", path.display(), reason));
        let content = fs::read_to_string(path).map_err(|e| unusable(e.to_string()))?;
        let content = content.trim();

        if !content.starts_with('{') {
            if content.is_empty() {
                return Err(unusable("file is empty".to_string()));
            }
            return Ok(Self::Token(content.to_string()));
        }

        let value: Value = serde_json::from_str(content).map_err(|e| unusable(e.to_string()))?;
        let is_key = value.get("type").and_then(Value::as_str) == Some("service_account")
            || value.get("private_key").is_some();
        if is_key {
            let key: ServiceAccountKey =
                serde_json::from_value(value).map_err(|e| unusable(format!("invalid service account key: {}", e)))?;
            return Ok(Self::ServiceAccount(key));
        }

        match value.get("access_token").and_then(Value::as_str).map(str::trim) {
            Some(token) if !token.is_empty() => Ok(Self::Token(token.to_string())),
            _ => Err(unusable("no service account key or access token found".to_string())),
        }
    }
}

#[derive(Debug, Serialize)]
struct GrantClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Hands out a valid bearer token, minting a new one when needed
#[derive(Debug)]
pub struct TokenProvider {
    client: Client,
    credentials: Credentials,
    cached: Option<CachedToken>,
}

impl TokenProvider {
    pub fn new(client: Client, credentials: Credentials) -> Self {
        Self {
            client,
            credentials,
            cached: None,
        }
    }

    /// Returns a token that is good for at least the refresh margin
    pub async fn access_token(&mut self) -> SinkResult<String> {
        let key = match &self.credentials {
            Credentials::Token(token) => return Ok(token.clone()),
            Credentials::ServiceAccount(key) => key,
        };

        let now = Utc::now();
        if let Some(cached) = &self.cached {
            if cached.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now {
                return Ok(cached.value.clone());
            }
        }

        let minted = mint_token(&self.client, key, now).await?;
        tracing::debug!(
            "Minted access token for {} valid until {}",
            key.client_email,
            minted.expires_at
        );
        let value = minted.value.clone();
        self.cached = Some(minted);
        Ok(value)
    }

    /// Drops the cached token so the next call mints a fresh one
    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}

/// Signs an RS256 grant assertion for the key
fn sign_assertion(key: &ServiceAccountKey, now: DateTime<Utc>) -> SinkResult<String> {
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| SinkError::Credentials(format!("invalid private key: {}", e)))?;

    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let iat = now.timestamp();
    let claims = GrantClaims {
        iss: &key.client_email,
        scope: BIGQUERY_SCOPE,
        aud: &key.token_uri,
        iat,
        exp: iat + ASSERTION_LIFETIME_SECS,
    };

    encode(&header, &claims, &encoding_key)
        .map_err(|e| SinkError::Credentials(format!("failed to sign assertion: {}", e)))
}

async fn mint_token(client: &Client, key: &ServiceAccountKey, now: DateTime<Utc>) -> SinkResult<CachedToken> {
    let assertion = sign_assertion(key, now)?;
    let response = client
        .post(&key.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SinkError::Credentials(format!(
            "token exchange failed with HTTP {}: {}",
            status,
            body.trim()
        )));
    }

    let token: TokenResponse = response.json().await?;
    let lifetime = token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS);
    Ok(CachedToken {
        value: token.access_token,
        expires_at: now + Duration::seconds(lifetime),
    })
}
