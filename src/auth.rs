//! OAuth2 client-credentials authentication.
//!
//! TrustPay issues bearer tokens from `/api/oauth2/token` in exchange for the
//! API username and password sent as Basic auth. Tokens are cached per
//! client; by default a token is reused for the lifetime of the client, or
//! until a [`TokenPolicy::Ttl`] elapses.

use crate::errors::{Result, TrustPayError};
use crate::types::TokenResponse;
use crate::utils::basic_auth_header;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Path of the token endpoint.
pub const TOKEN_ENDPOINT: &str = "/api/oauth2/token";

/// How long a fetched access token is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenPolicy {
    /// Reuse the first token for the lifetime of the client
    #[default]
    Indefinite,
    /// Fetch a new token once the cached one is older than the duration
    Ttl(Duration),
}

/// A fetched access token and when it was fetched.
#[derive(Debug, Clone)]
pub struct TokenCache {
    token: String,
    fetched_at: Instant,
}

impl TokenCache {
    /// Wraps a token fetched just now.
    pub fn new(token: String) -> Self {
        Self {
            token,
            fetched_at: Instant::now(),
        }
    }

    /// The cached token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Whether the token may still be used under `policy`.
    pub fn is_fresh(&self, policy: TokenPolicy) -> bool {
        match policy {
            TokenPolicy::Indefinite => true,
            TokenPolicy::Ttl(ttl) => self.fetched_at.elapsed() < ttl,
        }
    }
}

/// Obtains and caches bearer tokens.
///
/// The cache lock is held while a token is fetched, so concurrent callers
/// wait for the in-flight request instead of issuing their own.
pub struct Authenticator {
    http: Client,
    token_url: String,
    authorization: String,
    policy: TokenPolicy,
    cache: Mutex<Option<TokenCache>>,
}

impl Authenticator {
    /// Creates an authenticator for the API rooted at `base_url`.
    pub fn new(
        http: Client,
        base_url: &str,
        username: &str,
        password: &str,
        policy: TokenPolicy,
    ) -> Self {
        Self {
            http,
            token_url: format!("{}{}", base_url.trim_end_matches('/'), TOKEN_ENDPOINT),
            authorization: basic_auth_header(username, password),
            policy,
            cache: Mutex::new(None),
        }
    }

    /// Returns a usable access token, fetching one if none is cached or the
    /// cached one has expired under the configured policy.
    ///
    /// # Errors
    ///
    /// [`TrustPayError::AuthenticationError`] when the token endpoint answers
    /// with a non-200 status; [`TrustPayError::JsonError`] when the response
    /// has no `access_token`.
    pub async fn access_token(&self) -> Result<String> {
        let mut cache = self.cache.lock().await;

        if let Some(cached) = cache.as_ref() {
            if cached.is_fresh(self.policy) {
                return Ok(cached.token().to_string());
            }
            debug!("Cached access token expired");
        }

        let token = self.fetch_token().await?;
        *cache = Some(TokenCache::new(token.clone()));
        Ok(token)
    }

    /// Drops the cached token; the next call fetches a new one.
    pub async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }

    async fn fetch_token(&self) -> Result<String> {
        debug!(endpoint = TOKEN_ENDPOINT, "Requesting access token");

        let response = self
            .http
            .post(&self.token_url)
            .header(AUTHORIZATION, &self.authorization)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::OK {
            warn!(status = status.as_u16(), "Token request rejected");
            return Err(TrustPayError::AuthenticationError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TokenResponse = serde_json::from_str(&body)?;
        Ok(parsed.access_token)
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("token_url", &self.token_url)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
