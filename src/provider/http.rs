// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Bearer-token JSON client shared by the HTTP-based providers.
//!
//! Every request goes through a retry loop: rate limiting (429) is retried for
//! any method, server errors and connection failures only for `GET`, since a
//! repeated write could be applied twice. A 401 is retried once with a fresh
//! token when the [`TokenSource`] can supply one.

use reqwest::{Client as HttpClient, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, error, warn};
use url::Url;

use super::auth::TokenSource;
use crate::constants::PROVIDER_HTTP_TIMEOUT_SECS;
use crate::reconcilers::retry::{http_backoff, is_retryable_http_status, BackoffPolicy};

/// Failure of a single provider API request.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The API answered with a non-success status
    #[error("HTTP {status} from {method} {url}: {message}")]
    Status {
        method: Method,
        url: String,
        status: StatusCode,
        /// Response body, usually the provider's JSON error document
        message: String,
    },

    /// The request never produced a response (DNS, TLS, connect, timeout)
    #[error("{method} {url} failed: {source}")]
    Transport {
        method: Method,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response body did not match the expected document
    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// A request URL could not be built
    #[error("invalid API URL '{url}': {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The HTTP client itself could not be constructed
    #[error("failed to build HTTP client: {source}")]
    Client {
        #[source]
        source: reqwest::Error,
    },
}

impl ApiError {
    /// HTTP status, when the API answered at all
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// Whether repeating the same request later may succeed
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Status { status, .. } => is_retryable_http_status(*status),
            Self::Transport { .. } => true,
            Self::Decode { .. } | Self::Url { .. } | Self::Client { .. } => false,
        }
    }

    fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    fn is_retryable_for(&self, method: &Method) -> bool {
        match self {
            Self::Status { status, .. } if *status == StatusCode::TOO_MANY_REQUESTS => true,
            Self::Status { status, .. } => {
                *method == Method::GET && is_retryable_http_status(*status)
            }
            Self::Transport { .. } => *method == Method::GET,
            Self::Decode { .. } | Self::Url { .. } | Self::Client { .. } => false,
        }
    }
}

/// HTTP client with the provider request timeout.
///
/// # Errors
///
/// Returns [`ApiError::Client`] if the TLS backend cannot be initialised.
pub fn http_client() -> Result<HttpClient, ApiError> {
    HttpClient::builder()
        .timeout(Duration::from_secs(PROVIDER_HTTP_TIMEOUT_SECS))
        .build()
        .map_err(|source| ApiError::Client { source })
}

/// JSON API client authenticated with a bearer token.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: HttpClient,
    base_url: Url,
    token: Arc<dyn TokenSource>,
    backoff: BackoffPolicy,
}

impl ApiClient {
    /// Create a client for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Url`] if `base_url` is not an absolute URL, or
    /// [`ApiError::Client`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, token: Arc<dyn TokenSource>) -> Result<Self, ApiError> {
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized).map_err(|source| ApiError::Url {
            url: base_url.to_string(),
            source,
        })?;

        Ok(Self {
            http: http_client()?,
            base_url,
            token,
            backoff: http_backoff(),
        })
    }

    /// Replace the retry schedule
    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Absolute URL for `path` (relative to the base URL) with query parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Url`] if `path` cannot be joined onto the base URL.
    pub fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, ApiError> {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|source| ApiError::Url {
                url: path.to_string(),
                source,
            })?;

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// `GET` a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] for any non-success response after retries.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = self.url(path, query)?;
        let body = self.send(Method::GET, url.clone(), None).await?;
        decode(&url, &body)
    }

    /// `GET` a JSON document that may not exist; 404 yields `None`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] for any other non-success response.
    pub async fn get_optional<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>, ApiError> {
        match self.get(path, query).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// `POST` a JSON body and decode the JSON response.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] for any non-success response.
    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.write(Method::POST, path, body).await
    }

    /// `PATCH` a JSON body and decode the JSON response.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] for any non-success response.
    pub async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.write(Method::PATCH, path, body).await
    }

    /// `DELETE` a resource, ignoring the response body.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] for any non-success response.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let url = self.url(path, &[])?;
        self.send(Method::DELETE, url, None).await.map(|_| ())
    }

    async fn write<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path, &[])?;
        let payload = serde_json::to_value(body).map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })?;
        let text = self.send(method, url.clone(), Some(&payload)).await?;
        decode(&url, &text)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
    ) -> Result<String, ApiError> {
        let start_time = Instant::now();
        let mut attempt = 0;
        let mut reauthenticated = false;

        loop {
            let token = self.token.token().await?;
            match self.send_once(&method, &url, body, &token).await {
                Ok(text) => {
                    if attempt > 0 {
                        debug!(
                            method = %method,
                            url = %url,
                            attempt = attempt + 1,
                            elapsed = ?start_time.elapsed(),
                            "Provider API call succeeded after retries"
                        );
                    }
                    return Ok(text);
                }
                Err(e) if e.is_unauthorized() && !reauthenticated => {
                    if !self.token.invalidate(&token).await {
                        return Err(e);
                    }
                    warn!(
                        method = %method,
                        url = %url,
                        "Access token rejected, retrying with a fresh one"
                    );
                    reauthenticated = true;
                }
                Err(e) => {
                    if !e.is_retryable_for(&method) {
                        return Err(e);
                    }

                    if self.backoff.is_exhausted(start_time.elapsed()) {
                        error!(
                            method = %method,
                            url = %url,
                            attempt = attempt + 1,
                            error = %e,
                            "Max retry time exceeded, giving up"
                        );
                        return Err(e);
                    }

                    let duration = self.backoff.delay(attempt);
                    warn!(
                        method = %method,
                        url = %url,
                        attempt = attempt + 1,
                        retry_after = ?duration,
                        error = %e,
                        "Retryable provider API error, will retry"
                    );
                    tokio::time::sleep(duration).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&serde_json::Value>,
        token: &str,
    ) -> Result<String, ApiError> {
        debug!(method = %method, url = %url, "Provider API request");

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(payload) = body {
            request = request.json(payload);
        }

        let transport = |source| ApiError::Transport {
            method: method.clone(),
            url: url.to_string(),
            source,
        };

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let text = response.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(ApiError::Status {
                method: method.clone(),
                url: url.to_string(),
                status,
                message: text,
            });
        }

        Ok(text)
    }
}

fn decode<T: DeserializeOwned>(url: &Url, body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|source| ApiError::Decode {
        url: url.to_string(),
        source,
    })
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod http_tests;
