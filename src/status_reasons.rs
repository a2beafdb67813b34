// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Standard Kubernetes status condition reasons for `DNSSDServiceInstance`.
//!
//! Reasons are programmatic identifiers in CamelCase that explain why the
//! single `Ready` condition has its current status. The human-readable
//! counterpart goes in the condition `message`.
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   providerId: clouddns/my-project
//!   providerDescription: Google Cloud DNS
//!   advertiserId: "4817263541"
//!   status: Advertised
//!   observedGeneration: 3
//!   conditions:
//!     - type: Ready
//!       status: "True"
//!       reason: NewInstanceAdvertised
//!       message: "Advertised printer._ipp._tcp.example.com via Google Cloud DNS"
//! ```

/// Condition type for the encompassing readiness condition.
pub const CONDITION_TYPE_READY: &str = "Ready";

// ============================================================================
// Advertisement Lifecycle Reasons
// ============================================================================

/// No configured provider hosts a zone covering the instance's domain.
///
/// Not an error: the instance is retried periodically and picked up as soon
/// as a provider starts serving the domain.
pub const REASON_NO_PROVIDER_FOR_DOMAIN: &str = "NoProviderForDomain";

/// A provider was selected and records are being written.
pub const REASON_ADVERTISING: &str = "Advertising";

/// Every record of the instance was created by this reconciliation.
pub const REASON_NEW_INSTANCE_ADVERTISED: &str = "NewInstanceAdvertised";

/// Some records existed and were updated, deleted or completed.
pub const REASON_INSTANCE_UPDATED: &str = "InstanceUpdated";

/// Records already matched the instance; nothing was written.
pub const REASON_INSTANCE_UNCHANGED: &str = "InstanceUnchanged";

/// Deletion was requested and records are being removed.
pub const REASON_UNADVERTISING: &str = "Unadvertising";

/// Records were removed.
pub const REASON_UNADVERTISED: &str = "Unadvertised";

// ============================================================================
// Error Reasons
// ============================================================================

/// The instance spec failed validation (bad service type, port 0, ...).
///
/// Permanent until the spec is edited.
pub const REASON_INVALID_INSTANCE: &str = "InvalidInstance";

/// A previously recorded zone no longer exists in the provider.
pub const REASON_ZONE_NOT_FOUND: &str = "ZoneNotFound";

/// The provider recorded in status is no longer configured.
pub const REASON_PROVIDER_NOT_CONFIGURED: &str = "ProviderNotConfigured";

/// The advertiser ID recorded in status cannot be parsed by its provider.
pub const REASON_INVALID_ADVERTISER_ID: &str = "InvalidAdvertiserId";

/// An accepted change was still pending at the propagation deadline.
pub const REASON_PROPAGATION_TIMEOUT: &str = "PropagationTimeout";

/// The DNS mutation did not finish within the reconciliation deadline.
pub const REASON_ADVERTISE_TIMEOUT: &str = "AdvertiseTimeout";

/// Provider API rejected the credentials.
///
/// Maps to HTTP 401 Unauthorized or 403 Forbidden.
pub const REASON_PROVIDER_AUTH_FAILED: &str = "ProviderAuthFailed";

/// Provider API returned 404 for a zone, record or change.
pub const REASON_PROVIDER_RESOURCE_NOT_FOUND: &str = "ProviderResourceNotFound";

/// Provider API is rate limiting the operator.
///
/// Maps to HTTP 429 Too Many Requests.
pub const REASON_PROVIDER_RATE_LIMITED: &str = "ProviderRateLimited";

/// Provider API returned a server error.
///
/// Maps to HTTP 5xx.
pub const REASON_PROVIDER_UNAVAILABLE: &str = "ProviderUnavailable";

/// Provider API could not be reached (DNS, TLS, connection refused, timeout).
pub const REASON_PROVIDER_UNREACHABLE: &str = "ProviderUnreachable";

/// Provider API returned an unexpected response.
pub const REASON_PROVIDER_API_ERROR: &str = "ProviderApiError";
