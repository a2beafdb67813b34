// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Retry logic with exponential backoff for Kubernetes and provider API calls.
//!
//! Backoff is a pure calculation from attempt number to delay. Loops that need
//! to wait keep their own attempt counter and elapsed-time clock, so nothing is
//! shared between calls and schedules are trivially testable.

use anyhow::Result;
use reqwest::StatusCode;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::constants::{
    PROPAGATION_INITIAL_DELAY_MILLIS, PROPAGATION_MAX_DELAY_SECS, PROPAGATION_MAX_ELAPSED_SECS,
};

/// Kubernetes API retry initial interval (100ms)
const KUBE_INITIAL_INTERVAL_MILLIS: u64 = 100;

/// Kubernetes API retry maximum interval (5 seconds)
const KUBE_MAX_INTERVAL_SECS: u64 = 5;

/// Kubernetes API retry maximum elapsed time (30 seconds)
const KUBE_MAX_ELAPSED_TIME_SECS: u64 = 30;

/// HTTP retry initial interval (50ms)
const HTTP_INITIAL_INTERVAL_MILLIS: u64 = 50;

/// HTTP retry maximum interval (10 seconds)
const HTTP_MAX_INTERVAL_SECS: u64 = 10;

/// HTTP retry maximum elapsed time (2 minutes)
const HTTP_MAX_ELAPSED_TIME_SECS: u64 = 120;

/// Backoff multiplier (exponential growth factor)
const BACKOFF_MULTIPLIER: u32 = 2;

/// Capped exponential backoff schedule.
///
/// `delay(n) = min(initial * multiplier^n, max_interval)`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay before the first retry
    pub initial_interval: Duration,
    /// Upper bound for any single delay
    pub max_interval: Duration,
    /// Total time after which the caller should give up
    pub max_elapsed_time: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: u32,
}

impl BackoffPolicy {
    /// Delay to wait after the given zero-based attempt.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.checked_pow(attempt).unwrap_or(u32::MAX);
        self.initial_interval
            .checked_mul(factor)
            .map_or(self.max_interval, |d| d.min(self.max_interval))
    }

    /// Whether `elapsed` has used up the retry budget
    #[must_use]
    pub fn is_exhausted(&self, elapsed: Duration) -> bool {
        elapsed >= self.max_elapsed_time
    }
}

/// Backoff for Kubernetes API calls (status writes, finalizer patches).
///
/// Kept short because the whole write runs under the status-write deadline.
///
/// # Retry Schedule
///
/// 100ms, 200ms, 400ms, 800ms, 1.6s, 3.2s, then 5s until 30 seconds elapsed.
#[must_use]
pub fn default_backoff() -> BackoffPolicy {
    BackoffPolicy {
        initial_interval: Duration::from_millis(KUBE_INITIAL_INTERVAL_MILLIS),
        max_interval: Duration::from_secs(KUBE_MAX_INTERVAL_SECS),
        max_elapsed_time: Duration::from_secs(KUBE_MAX_ELAPSED_TIME_SECS),
        multiplier: BACKOFF_MULTIPLIER,
    }
}

/// Backoff for provider HTTP API retries.
///
/// # Retry Schedule
///
/// 50ms, 100ms, 200ms, ... 6.4s, then 10s until 2 minutes elapsed.
#[must_use]
pub fn http_backoff() -> BackoffPolicy {
    BackoffPolicy {
        initial_interval: Duration::from_millis(HTTP_INITIAL_INTERVAL_MILLIS),
        max_interval: Duration::from_secs(HTTP_MAX_INTERVAL_SECS),
        max_elapsed_time: Duration::from_secs(HTTP_MAX_ELAPSED_TIME_SECS),
        multiplier: BACKOFF_MULTIPLIER,
    }
}

/// Backoff for polling an accepted change until it is live.
///
/// # Retry Schedule
///
/// 500ms, 1s, 2s, 4s, 8s, 16s, then 30s until 5 minutes elapsed.
#[must_use]
pub fn propagation_backoff() -> BackoffPolicy {
    BackoffPolicy {
        initial_interval: Duration::from_millis(PROPAGATION_INITIAL_DELAY_MILLIS),
        max_interval: Duration::from_secs(PROPAGATION_MAX_DELAY_SECS),
        max_elapsed_time: Duration::from_secs(PROPAGATION_MAX_ELAPSED_SECS),
        multiplier: BACKOFF_MULTIPLIER,
    }
}

/// Determine if an HTTP status code is retryable.
///
/// # Retryable Status Codes
///
/// - **429** (Too Many Requests) - Rate limiting
/// - **500** (Internal Server Error) - Server error
/// - **502** (Bad Gateway) - Proxy/gateway error
/// - **503** (Service Unavailable) - Temporary unavailability
/// - **504** (Gateway Timeout) - Gateway timeout
#[must_use]
pub fn is_retryable_http_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Retry a Kubernetes API call with exponential backoff.
///
/// Retries on conflicts (409), rate limiting (429), server errors (5xx) and
/// connection failures. Everything else fails immediately.
///
/// # Errors
///
/// Returns the last error once it is not retryable or the backoff budget is
/// used up.
///
/// # Example
///
/// ```no_run
/// use kube::{Api, Client};
/// use dnssd_operator::crd::DNSSDServiceInstance;
/// use dnssd_operator::reconcilers::retry::retry_api_call;
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = Client::try_default().await?;
/// let api: Api<DNSSDServiceInstance> = Api::namespaced(client, "default");
///
/// let instance = retry_api_call(
///     || async { api.get("printer").await },
///     "get instance printer"
/// ).await?;
/// # Ok(())
/// # }
/// ```
pub async fn retry_api_call<T, F, Fut>(mut operation: F, operation_name: &str) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, kube::Error>>,
{
    let backoff = default_backoff();
    let start_time = Instant::now();
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        elapsed = ?start_time.elapsed(),
                        "Kubernetes API call succeeded after retries"
                    );
                }
                return Ok(value);
            }
            Err(e) => {
                if !is_retryable_error(&e) {
                    error!(
                        operation = operation_name,
                        error = %e,
                        "Non-retryable Kubernetes API error, failing immediately"
                    );
                    return Err(e.into());
                }

                if backoff.is_exhausted(start_time.elapsed()) {
                    error!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        elapsed = ?start_time.elapsed(),
                        error = %e,
                        "Max retry time exceeded, giving up"
                    );
                    return Err(anyhow::anyhow!(
                        "Max retry time exceeded after {} attempts: {e}",
                        attempt + 1
                    ));
                }

                let duration = backoff.delay(attempt);
                warn!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    retry_after = ?duration,
                    error = %e,
                    "Retryable Kubernetes API error, will retry"
                );
                tokio::time::sleep(duration).await;
                attempt += 1;
            }
        }
    }
}

/// Determine if a Kubernetes error is retryable.
///
/// # Retryable Errors
///
/// - **HTTP 409** (Conflict) - Concurrent writer; the write is simply repeated
/// - **HTTP 429** (Too Many Requests) - Rate limiting
/// - **HTTP 5xx** (Server Errors) - Temporary API server issues
/// - **Service Errors** - Network/connection issues
pub(crate) fn is_retryable_error(err: &kube::Error) -> bool {
    match err {
        kube::Error::Api(api_err) => {
            api_err.code == 409 || api_err.code == 429 || (500..600).contains(&api_err.code)
        }
        kube::Error::Service(_) => true,
        _ => false,
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
