//! GitHub App JWT signing and the installation-token cache (§5, §6).

use std::collections::HashMap;
use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::HostError;

const API_BASE: &str = "https://api.github.com";

/// A GitHub App's identity, used to mint short-lived JWTs for the
/// installation-token exchange.
#[derive(Clone)]
pub struct AppCredentials {
    pub app_id: u64,
    private_key_pem: Vec<u8>,
}

impl AppCredentials {
    pub fn new(app_id: u64, private_key_pem: Vec<u8>) -> Self {
        Self {
            app_id,
            private_key_pem,
        }
    }

    /// Signs a fresh App JWT, valid for 9 minutes (under GitHub's 10-minute
    /// ceiling, leaving margin for clock skew).
    pub fn sign_app_jwt(&self) -> Result<String, HostError> {
        #[derive(Serialize)]
        struct Claims {
            iat: i64,
            exp: i64,
            iss: String,
        }

        let now = Utc::now();
        let claims = Claims {
            iat: (now - Duration::seconds(60)).timestamp(),
            exp: (now + Duration::minutes(9)).timestamp(),
            iss: self.app_id.to_string(),
        };

        let key = EncodingKey::from_rsa_pem(&self.private_key_pem).map_err(|err| {
            HostError::new("JWT", "app-credentials", "sign", err.to_string())
        })?;

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key).map_err(|err| {
            HostError::new("JWT", "app-credentials", "sign", err.to_string())
        })
    }

    /// Resolves the installation id for `org` via `GET
    /// /orgs/{org}/installation`, authenticated with the App JWT (§6).
    pub async fn resolve_installation_id(&self, http: &reqwest::Client, org: &str) -> Result<u64, HostError> {
        let jwt = self.sign_app_jwt()?;
        let url = format!("{API_BASE}/orgs/{org}/installation");
        let response = http
            .get(&url)
            .bearer_auth(&jwt)
            .header("User-Agent", "file-copier")
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|err| HostError::transport("GET", &url, &err))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HostError::new("GET", &url, status, body));
        }
        #[derive(Deserialize)]
        struct InstallationResponse {
            id: u64,
        }
        let parsed: InstallationResponse = response
            .json()
            .await
            .map_err(|err| HostError::new("GET", &url, status, err.to_string()))?;
        Ok(parsed.id)
    }

    /// Exchanges the App JWT for a short-lived installation access token via
    /// `POST /app/installations/{id}/access_tokens` (§5, §6). Returns the
    /// token and its expiry, for [`InstallationTokenCache::get_or_refresh`]
    /// to cache with the 1-minute safety margin.
    pub async fn exchange_installation_token(
        &self,
        http: &reqwest::Client,
        installation_id: u64,
    ) -> Result<(String, DateTime<Utc>), HostError> {
        let jwt = self.sign_app_jwt()?;
        let url = format!("{API_BASE}/app/installations/{installation_id}/access_tokens");
        let response = http
            .post(&url)
            .bearer_auth(&jwt)
            .header("User-Agent", "file-copier")
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|err| HostError::transport("POST", &url, &err))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HostError::new("POST", &url, status, body));
        }
        #[derive(Deserialize)]
        struct TokenResponse {
            token: String,
            expires_at: DateTime<Utc>,
        }
        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|err| HostError::new("POST", &url, status, err.to_string()))?;
        Ok((parsed.token, parsed.expires_at))
    }
}

/// A cached installation access token.
#[derive(Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Caches installation tokens keyed by organization (§5 "Shared resources").
///
/// Regenerates 1 minute before the documented 10-minute expiry, per §5's
/// explicit safety margin.
#[derive(Default)]
pub struct InstallationTokenCache {
    tokens: RwLock<HashMap<String, CachedToken>>,
}

const SAFETY_MARGIN: Duration = Duration::minutes(1);

impl InstallationTokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a cached, still-valid token for `org`, or calls `refresh` to
    /// mint a new one and caches it. `refresh` performs the actual
    /// installation-token exchange and returns `(token, expires_at)`.
    pub async fn get_or_refresh<F, Fut>(
        &self,
        org: &str,
        refresh: F,
    ) -> Result<String, HostError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(String, DateTime<Utc>), HostError>>,
    {
        if let Some(token) = self.fresh_cached(org) {
            return Ok(token);
        }

        let (token, expires_at) = refresh().await?;
        self.tokens.write().insert(
            org.to_string(),
            CachedToken {
                token: token.clone(),
                expires_at,
            },
        );
        Ok(token)
    }

    fn fresh_cached(&self, org: &str) -> Option<String> {
        let tokens = self.tokens.read();
        let cached = tokens.get(org)?;
        if Utc::now() + SAFETY_MARGIN < cached.expires_at {
            Some(cached.token.clone())
        } else {
            None
        }
    }
}

/// Resolves an installation for `org` and mints (or reuses) an access
/// token, returning a [`crate::github::GithubClient`] bound to it.
///
/// This is the convenience entry point a binary wires up once per
/// organization; the pipeline and writer only ever see the narrow
/// [`crate::client::HostClient`] trait, never this authentication machinery.
pub async fn authenticate(
    creds: &AppCredentials,
    cache: &InstallationTokenCache,
    http: &reqwest::Client,
    org: &str,
) -> Result<crate::github::GithubClient, HostError> {
    let token = cache
        .get_or_refresh(org, || async {
            let installation_id = creds.resolve_installation_id(http, org).await?;
            creds.exchange_installation_token(http, installation_id).await
        })
        .await?;
    Ok(crate::github::GithubClient::new(http.clone(), token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_cached_token_without_refreshing() {
        let cache = InstallationTokenCache::new();
        let refreshes = std::sync::atomic::AtomicU32::new(0);
        for _ in 0..3 {
            let token = cache
                .get_or_refresh("acme", || {
                    refreshes.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    async { Ok(("tok-1".to_string(), Utc::now() + Duration::minutes(10))) }
                })
                .await
                .unwrap();
            assert_eq!(token, "tok-1");
        }
        assert_eq!(refreshes.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refreshes_once_cached_token_is_within_safety_margin() {
        let cache = InstallationTokenCache::new();
        cache
            .tokens
            .write()
            .insert(
                "acme".to_string(),
                CachedToken {
                    token: "stale".to_string(),
                    expires_at: Utc::now() + Duration::seconds(30),
                },
            );

        let token = cache
            .get_or_refresh("acme", || async {
                Ok(("fresh".to_string(), Utc::now() + Duration::minutes(10)))
            })
            .await
            .unwrap();
        assert_eq!(token, "fresh");
    }

    #[tokio::test]
    async fn different_organizations_cache_independently() {
        let cache = InstallationTokenCache::new();
        let a = cache
            .get_or_refresh("acme", || async {
                Ok(("tok-acme".to_string(), Utc::now() + Duration::minutes(10)))
            })
            .await
            .unwrap();
        let b = cache
            .get_or_refresh("other", || async {
                Ok(("tok-other".to_string(), Utc::now() + Duration::minutes(10)))
            })
            .await
            .unwrap();
        assert_eq!(a, "tok-acme");
        assert_eq!(b, "tok-other");
    }
}
