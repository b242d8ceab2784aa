//! Bearer token acquisition for broker requests.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::AuthError;
use crate::wire::TokenResponse;

/// Tokens are re-acquired this long before the issuer says they expire.
const REFRESH_SKEW: Duration = Duration::from_secs(10);

/// Source of bearer tokens for broker requests.
#[async_trait]
pub trait AuthClient: Send + Sync {
    /// Return a token valid for at least the next request.
    async fn access_token(&self) -> Result<String, AuthError>;
}

/// An [`AuthClient`] that always hands out the same token.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    /// Wrap a pre-acquired token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticToken(..)")
    }
}

#[async_trait]
impl AuthClient for StaticToken {
    async fn access_token(&self) -> Result<String, AuthError> {
        Ok(self.0.clone())
    }
}

/// Settings for the client-credentials flow.
#[derive(Clone)]
pub struct OidcConfig {
    /// Base URL of the token issuer (Keycloak style).
    pub base_url: String,
    /// Realm the client is registered in (default: `privateaim`).
    pub realm: String,
    /// Client identifier.
    pub client_id: String,
    /// Client secret.
    pub client_secret: String,
    /// Timeout for a single token request (default: 10s).
    pub timeout: Duration,
}

impl OidcConfig {
    /// Create a config with the default realm and timeout.
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            realm: "privateaim".to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Set the realm.
    pub fn with_realm(mut self, realm: &str) -> Self {
        self.realm = realm.to_string();
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Token endpoint URL for this realm.
    pub fn token_url(&self) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/token",
            self.base_url.trim_end_matches('/'),
            self.realm
        )
    }
}

impl fmt::Debug for OidcConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OidcConfig")
            .field("base_url", &self.base_url)
            .field("realm", &self.realm)
            .field("client_id", &self.client_id)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Client-credentials token client with expiry-aware caching.
///
/// Tokens whose response carries `expires_in` are reused until shortly
/// before they expire; tokens without an expiry are fetched per call.
pub struct OidcAuthClient {
    config: OidcConfig,
    http: reqwest::Client,
    cache: Mutex<Option<CachedToken>>,
}

impl fmt::Debug for OidcAuthClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OidcAuthClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OidcAuthClient {
    /// Create a new token client.
    pub fn new(config: OidcConfig) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            config,
            http,
            cache: Mutex::new(None),
        })
    }

    async fn request_token(&self) -> Result<TokenResponse, AuthError> {
        let response = self
            .http
            .post(self.config.token_url())
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status != reqwest::StatusCode::OK {
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(AuthError::Decode)
    }
}

#[async_trait]
impl AuthClient for OidcAuthClient {
    async fn access_token(&self) -> Result<String, AuthError> {
        // Held across the request so concurrent callers share one refresh.
        let mut cached = self.cache.lock().await;

        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.request_token().await?;
        tracing::debug!(
            "acquired access token from `{}` (expires_in: {:?})",
            self.config.base_url,
            fresh.expires_in
        );

        // Lifetimes too large to represent as an instant are not cached.
        *cached = fresh
            .expires_in
            .map(Duration::from_secs)
            .filter(|lifetime| *lifetime > REFRESH_SKEW)
            .and_then(|lifetime| Instant::now().checked_add(lifetime - REFRESH_SKEW))
            .map(|refresh_at| CachedToken {
                value: fresh.access_token.clone(),
                refresh_at,
            });

        Ok(fresh.access_token)
    }
}
