// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Bearer tokens for the provider APIs.
//!
//! DNSimple account tokens do not expire, so a [`StaticToken`] is enough.
//! Google OAuth2 access tokens live for about an hour; [`MetadataToken`]
//! fetches them from the GKE/GCE metadata server (Workload Identity or the
//! node's service account) and caches each one until shortly before it
//! expires.
//!
//! When an API answers 401, [`ApiClient`](super::http::ApiClient) invalidates
//! the token it sent and retries once with a fresh one.

use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};
use url::Url;

use super::http::{http_client, ApiError};
use crate::constants::TOKEN_REFRESH_MARGIN_SECS;

/// Source of the bearer token sent with every API request.
#[async_trait]
pub trait TokenSource: Send + Sync + fmt::Debug {
    /// Token to send with the next request.
    async fn token(&self) -> Result<String, ApiError>;

    /// Forget `rejected` after the API refused it.
    ///
    /// Returns whether the next [`token`](Self::token) call may yield a
    /// different token, i.e. whether retrying is worthwhile.
    async fn invalidate(&self, rejected: &str) -> bool;
}

/// A token configured once and never refreshed.
pub struct StaticToken(String);

impl StaticToken {
    #[must_use]
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
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<String, ApiError> {
        Ok(self.0.clone())
    }

    async fn invalidate(&self, _rejected: &str) -> bool {
        false
    }
}

/// Token document served by the metadata server.
#[derive(Deserialize)]
struct AccessToken {
    access_token: String,
    /// Lifetime in seconds
    expires_in: u64,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// OAuth2 access tokens from the metadata server, refreshed before expiry.
pub struct MetadataToken {
    http: HttpClient,
    url: Url,
    cached: Mutex<Option<CachedToken>>,
}

impl fmt::Debug for MetadataToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataToken")
            .field("url", &self.url.as_str())
            .finish_non_exhaustive()
    }
}

impl MetadataToken {
    /// Token source reading from `token_url`, normally
    /// `http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token`.
    ///
    /// # Errors
    ///
    /// Returns an error if `token_url` is not an absolute URL or the HTTP
    /// client cannot be built.
    pub fn new(token_url: &str) -> Result<Self, ApiError> {
        let url = Url::parse(token_url).map_err(|source| ApiError::Url {
            url: token_url.to_string(),
            source,
        })?;

        Ok(Self {
            http: http_client()?,
            url,
            cached: Mutex::new(None),
        })
    }

    async fn fetch(&self) -> Result<AccessToken, ApiError> {
        let transport = |source| ApiError::Transport {
            method: Method::GET,
            url: self.url.to_string(),
            source,
        };

        let response = self
            .http
            .get(self.url.clone())
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        let text = response.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(ApiError::Status {
                method: Method::GET,
                url: self.url.to_string(),
                status,
                message: text,
            });
        }

        serde_json::from_str(&text).map_err(|source| ApiError::Decode {
            url: self.url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl TokenSource for MetadataToken {
    async fn token(&self) -> Result<String, ApiError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
            debug!(url = %self.url, "Access token due for refresh");
        }

        let fresh = self.fetch().await?;
        let lifetime = Duration::from_secs(fresh.expires_in);
        let refresh_at =
            Instant::now() + lifetime.saturating_sub(Duration::from_secs(TOKEN_REFRESH_MARGIN_SECS));
        info!(
            url = %self.url,
            expires_in = ?lifetime,
            "Fetched access token"
        );

        *cached = Some(CachedToken {
            value: fresh.access_token.clone(),
            refresh_at,
        });
        Ok(fresh.access_token)
    }

    async fn invalidate(&self, rejected: &str) -> bool {
        let mut cached = self.cached.lock().await;
        if cached.as_ref().is_some_and(|token| token.value == rejected) {
            *cached = None;
        }
        true
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod auth_tests;
