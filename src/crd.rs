// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for DNS-SD service advertisement.
//!
//! # Resource Types
//!
//! - [`DNSSDServiceInstance`] - A named, typed service endpoint that should be
//!   discoverable through PTR/SRV/TXT records in a hosted DNS zone.
//!
//! # Example
//!
//! ```rust,no_run
//! use dnssd_operator::crd::DNSSDServiceInstanceSpec;
//! use std::collections::BTreeMap;
//!
//! let spec = DNSSDServiceInstanceSpec {
//!     name: "printer".to_string(),
//!     service: "_ipp._tcp".to_string(),
//!     domain: "example.com".to_string(),
//!     target_host: "printer.example.com".to_string(),
//!     target_port: 631,
//!     priority: 0,
//!     weight: 0,
//!     attributes: vec![BTreeMap::from([("rp".to_string(), "ipp/print".to_string())])],
//!     ttl: None,
//! };
//! ```

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Condition represents an observation of a resource's current state.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition. The operator only reports `Ready`.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// Progress of a service instance through advertisement and unadvertisement.
///
/// ```text
/// Pending -> Advertising -> { AdvertiseError | Advertised }
/// Advertised -> Unadvertising -> { UnadvertiseError | Unadvertised }
/// ```
///
/// The error states are retried back into `Advertising`/`Unadvertising` on the
/// next reconciliation.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub enum AdvertisementStatus {
    /// None of the configured providers hosts a zone covering the instance's domain.
    Pending,

    /// A provider was selected and the DNS records are being created or updated.
    Advertising,

    /// The provider returned an error while advertising.
    AdvertiseError,

    /// The DNS records match the instance specification.
    Advertised,

    /// The DNS records are being removed.
    Unadvertising,

    /// The provider returned an error while unadvertising.
    UnadvertiseError,

    /// The DNS records were removed. Rarely observed, since the resource is
    /// deleted shortly afterwards.
    Unadvertised,
}

impl AdvertisementStatus {
    /// String form, as stored in the status subresource.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Advertising => "Advertising",
            Self::AdvertiseError => "AdvertiseError",
            Self::Advertised => "Advertised",
            Self::Unadvertising => "Unadvertising",
            Self::UnadvertiseError => "UnadvertiseError",
            Self::Unadvertised => "Unadvertised",
        }
    }
}

impl std::fmt::Display for AdvertisementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `DNSSDServiceInstance` status, overwritten in full by each reconciliation.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DNSSDServiceInstanceStatus {
    /// Identifier of the provider that hosts the instance's records (e.g. `clouddns/my-project`).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub provider_id: String,

    /// Human-readable description of the provider.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub provider_description: String,

    /// Opaque identifier of the zone the records were written to.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub advertiser_id: String,

    /// Current advertisement state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AdvertisementStatus>,

    /// Last error or outcome of the most recent operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Generation of the spec the status refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// `DNSSDServiceInstance` declares a DNS-SD service instance.
///
/// The operator publishes the instance as a PTR record at the service's
/// enumeration domain (`<service>.<domain>`) plus SRV and TXT records at the
/// instance name (`<name>.<service>.<domain>`), in whichever configured provider
/// hosts the domain. The records are removed when the resource is deleted.
///
/// # Example
///
/// ```yaml
/// apiVersion: dnssd.operators.dev/v1alpha1
/// kind: DNSSDServiceInstance
/// metadata:
///   name: office-printer
///   namespace: default
/// spec:
///   name: Office Printer
///   service: _ipp._tcp
///   domain: example.com
///   targetHost: printer.example.com
///   targetPort: 631
///   attributes:
///     - rp: ipp/print
///       color: ""
///   ttl: 120
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[kube(
    group = "dnssd.operators.dev",
    version = "v1alpha1",
    kind = "DNSSDServiceInstance",
    namespaced,
    doc = "DNSSDServiceInstance is a DNS-SD service instance advertised through PTR, SRV and TXT records in a hosted DNS zone.",
    printcolumn = r#"{"name":"Instance","type":"string","jsonPath":".spec.name"}"#,
    printcolumn = r#"{"name":"Service","type":"string","jsonPath":".spec.service"}"#,
    printcolumn = r#"{"name":"Domain","type":"string","jsonPath":".spec.domain"}"#,
    printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.status"}"#
)]
#[kube(status = "DNSSDServiceInstanceStatus")]
#[serde(rename_all = "camelCase")]
pub struct DNSSDServiceInstanceSpec {
    /// Instance name, the first label of the instance's DNS name.
    ///
    /// May contain spaces, dots and other UTF-8 text; it is escaped as a single label.
    pub name: String,

    /// Service type, e.g. `_http._tcp`.
    #[schemars(regex(pattern = r"^_[a-zA-Z0-9-]+\._(tcp|udp)$"))]
    pub service: String,

    /// Domain the service is advertised in, e.g. `example.com`.
    pub domain: String,

    /// Host name the service is reachable at.
    pub target_host: String,

    /// Port the service listens on.
    #[schemars(range(min = 1, max = 65535))]
    pub target_port: u16,

    /// SRV priority. Lower values are preferred.
    #[serde(default)]
    pub priority: u16,

    /// SRV weight among targets with the same priority.
    #[serde(default)]
    pub weight: u16,

    /// TXT attribute sets. Each map becomes one TXT record; an empty value
    /// denotes a boolean flag.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<BTreeMap<String, String>>,

    /// Time To Live in seconds for all records. Defaults to 60 when unset or zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
