// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the DNS-SD operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for the DNS-SD CRDs
pub const API_GROUP: &str = "dnssd.operators.dev";

/// API version for the DNS-SD CRDs
pub const API_VERSION: &str = "v1alpha1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "dnssd.operators.dev/v1alpha1";

/// Kind name for `DNSSDServiceInstance` resource
pub const KIND_DNSSD_SERVICE_INSTANCE: &str = "DNSSDServiceInstance";

/// Finalizer that blocks deletion until the instance has been unadvertised
pub const UNADVERTISE_FINALIZER: &str = "dnssd.operators.dev/unadvertise";

/// Field manager recorded on status and finalizer patches
pub const FIELD_MANAGER: &str = "dnssd-operator";

// ============================================================================
// DNS-SD Constants
// ============================================================================

/// TTL applied when a service instance does not specify one (seconds)
pub const DEFAULT_INSTANCE_TTL_SECS: u32 = 60;

/// Maximum length of a single TXT character-string
pub const MAX_TXT_SEGMENT_LEN: usize = 255;

// ============================================================================
// Reconciliation Timeouts
// ============================================================================

/// Deadline for the DNS mutation part of a reconciliation
pub const ADVERTISE_TIMEOUT_SECS: u64 = 30;

/// Deadline for a single status write-back, independent of the mutation deadline
pub const STATUS_WRITE_TIMEOUT_SECS: u64 = 3;

// ============================================================================
// Propagation Wait Constants
// ============================================================================

/// First delay between change-status polls
pub const PROPAGATION_INITIAL_DELAY_MILLIS: u64 = 500;

/// Upper bound on the delay between change-status polls
pub const PROPAGATION_MAX_DELAY_SECS: u64 = 30;

/// Total time a change may remain pending before giving up
pub const PROPAGATION_MAX_ELAPSED_SECS: u64 = 300;

// ============================================================================
// Controller Requeue Constants
// ============================================================================

/// Requeue duration for controller errors (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Requeue duration while no provider claims the instance's domain
pub const PENDING_REQUEUE_DURATION_SECS: u64 = 30;

/// Requeue duration for advertised instances, to repair drift in DNS
pub const RESYNC_REQUEUE_DURATION_SECS: u64 = 300;

// ============================================================================
// Provider API Constants
// ============================================================================

/// Default base URL of the Google Cloud DNS v1 API
pub const CLOUDDNS_DEFAULT_API_URL: &str = "https://dns.googleapis.com/dns/v1/";

/// Default GKE/GCE metadata server URL for Google Cloud DNS access tokens
pub const CLOUDDNS_METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Seconds before expiry at which a cached access token is refreshed
pub const TOKEN_REFRESH_MARGIN_SECS: u64 = 60;

/// Default base URL of the DNSimple v2 API
pub const DNSIMPLE_DEFAULT_API_URL: &str = "https://api.dnsimple.com/v2/";

/// Page size requested when listing DNSimple records
pub const DNSIMPLE_PAGE_SIZE: u32 = 100;

/// Timeout applied to every provider HTTP request
pub const PROVIDER_HTTP_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Port for Prometheus metrics HTTP server
pub const METRICS_SERVER_PORT: u16 = 8080;

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Bind address for metrics HTTP server
pub const METRICS_SERVER_BIND_ADDRESS: &str = "0.0.0.0";
