// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Provider error types.
//!
//! Every error a provider or advertiser can return carries enough context
//! (operation, record type, zone) to diagnose without retrying blindly, and
//! maps to a status condition reason.

use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

use super::http::ApiError;
use crate::dnssd::ValidationError;
use crate::status_reasons::{
    REASON_ADVERTISE_TIMEOUT, REASON_INVALID_ADVERTISER_ID, REASON_INVALID_INSTANCE,
    REASON_PROPAGATION_TIMEOUT, REASON_PROVIDER_API_ERROR, REASON_PROVIDER_AUTH_FAILED,
    REASON_PROVIDER_NOT_CONFIGURED, REASON_PROVIDER_RATE_LIMITED,
    REASON_PROVIDER_RESOURCE_NOT_FOUND, REASON_PROVIDER_UNAVAILABLE, REASON_PROVIDER_UNREACHABLE,
    REASON_ZONE_NOT_FOUND,
};

/// Errors returned by [`Provider`](super::Provider) and
/// [`Advertiser`](super::Advertiser) implementations.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The instance was rejected before any backend call
    #[error("invalid service instance: {0}")]
    InvalidInstance(#[from] ValidationError),

    /// A previously recorded zone no longer exists or is not accessible
    #[error("zone '{zone}' not found in provider {provider}")]
    ZoneNotFound {
        /// Provider ID
        provider: String,
        /// Zone identifier or name that was looked up
        zone: String,
    },

    /// A recorded provider ID does not match any configured provider
    #[error("provider '{0}' is not configured")]
    UnknownProvider(String),

    /// A backend API call failed
    #[error("{operation} {record_type} in zone '{zone}' failed: {source}")]
    Api {
        /// What was being done, e.g. "list", "submit change"
        operation: &'static str,
        /// Record type(s) involved, or "zone" for zone lookups
        record_type: &'static str,
        /// Zone name or identifier
        zone: String,
        #[source]
        source: ApiError,
    },

    /// An accepted change did not become live before the propagation deadline
    #[error("change {change_id} in zone '{zone}' still pending after {elapsed:?}")]
    PropagationTimeout {
        zone: String,
        change_id: String,
        elapsed: Duration,
    },

    /// A recorded advertiser ID is malformed for this provider
    #[error("invalid advertiser id '{0}'")]
    InvalidAdvertiserId(String),

    /// An advertise or unadvertise call overran the reconciliation deadline
    #[error("{operation} in zone '{zone}' did not finish within {after:?}")]
    Timeout {
        operation: &'static str,
        zone: String,
        after: Duration,
    },
}

impl ProviderError {
    /// Wrap an API error with its operation context.
    pub fn api(
        operation: &'static str,
        record_type: &'static str,
        zone: impl Into<String>,
    ) -> impl FnOnce(ApiError) -> Self {
        let zone = zone.into();
        move |source| Self::Api {
            operation,
            record_type,
            zone,
            source,
        }
    }

    /// Returns true if this error is transient and the operation should be retried.
    ///
    /// A vanished zone counts as transient: it may reappear, and unadvertising
    /// keeps retrying until it does or the finalizer is removed by hand.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Api { source, .. } => source.is_transient(),
            Self::ZoneNotFound { .. } | Self::PropagationTimeout { .. } | Self::Timeout { .. } => {
                true
            }
            Self::InvalidInstance(_) | Self::UnknownProvider(_) | Self::InvalidAdvertiserId(_) => {
                false
            }
        }
    }

    /// Returns the Kubernetes status reason code for this error.
    #[must_use]
    pub fn status_reason(&self) -> &'static str {
        match self {
            Self::InvalidInstance(_) => REASON_INVALID_INSTANCE,
            Self::ZoneNotFound { .. } => REASON_ZONE_NOT_FOUND,
            Self::UnknownProvider(_) => REASON_PROVIDER_NOT_CONFIGURED,
            Self::PropagationTimeout { .. } => REASON_PROPAGATION_TIMEOUT,
            Self::InvalidAdvertiserId(_) => REASON_INVALID_ADVERTISER_ID,
            Self::Timeout { .. } => REASON_ADVERTISE_TIMEOUT,
            Self::Api { source, .. } => match source {
                ApiError::Transport { .. } => REASON_PROVIDER_UNREACHABLE,
                _ => map_api_status_to_reason(source.status()),
            },
        }
    }
}

/// Map a provider HTTP status to a condition reason.
///
/// | HTTP Code | Reason |
/// |-----------|--------|
/// | 401, 403 | `ProviderAuthFailed` |
/// | 404 | `ProviderResourceNotFound` |
/// | 429 | `ProviderRateLimited` |
/// | 5xx | `ProviderUnavailable` |
/// | other | `ProviderApiError` |
#[must_use]
pub fn map_api_status_to_reason(status: Option<StatusCode>) -> &'static str {
    match status.map(|s| s.as_u16()) {
        Some(401 | 403) => REASON_PROVIDER_AUTH_FAILED,
        Some(404) => REASON_PROVIDER_RESOURCE_NOT_FOUND,
        Some(429) => REASON_PROVIDER_RATE_LIMITED,
        Some(500..=599) => REASON_PROVIDER_UNAVAILABLE,
        _ => REASON_PROVIDER_API_ERROR,
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
