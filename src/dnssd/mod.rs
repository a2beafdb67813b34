// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS-SD (RFC 6763) service instance model.
//!
//! A [`ServiceInstance`] is the provider-agnostic description of one advertised
//! service. From it the [`records`] submodule derives the PTR, SRV and TXT
//! records that make the instance discoverable. Nothing in this module performs
//! I/O.
//!
//! # Naming
//!
//! - *instance name*: `<escaped instance label>.<service type>.<domain>`
//! - *enumeration domain*: `<service type>.<domain>`, the owner of the PTR set
//!   that lists every instance of the service type.
//!
//! # Example
//!
//! ```rust
//! use dnssd_operator::dnssd::{Attributes, ServiceInstance};
//! use std::time::Duration;
//!
//! let instance = ServiceInstance {
//!     name: "Office Printer".to_string(),
//!     service_type: "_ipp._tcp".to_string(),
//!     domain: "example.com".to_string(),
//!     target_host: "printer.example.com".to_string(),
//!     target_port: 631,
//!     priority: 0,
//!     weight: 0,
//!     attributes: vec![Attributes::new().with_pair("rp", b"ipp/print")],
//!     ttl: Duration::from_secs(60),
//! };
//!
//! assert_eq!(instance.instance_name(), "Office\\032Printer._ipp._tcp.example.com");
//! assert_eq!(instance.enumeration_domain(), "_ipp._tcp.example.com");
//! ```

pub mod records;

use crate::constants::{DEFAULT_INSTANCE_TTL_SECS, MAX_TXT_SEGMENT_LEN};
use crate::crd::DNSSDServiceInstanceSpec;
use hickory_proto::rr::Name;
use std::fmt::Write as _;
use std::time::Duration;
use thiserror::Error;

pub use records::{
    desired_records, DesiredRecords, Record, RecordData, RecordType, SrvData, TxtData,
};

/// Reasons a service instance is rejected before any provider is contacted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is empty
    #[error("{field} must not be empty")]
    EmptyField {
        /// Name of the empty field
        field: &'static str,
    },

    /// The service type is not of the form `_service._tcp` / `_service._udp`
    #[error("service type '{0}' must be of the form _<service>._tcp or _<service>._udp")]
    InvalidServiceType(String),

    /// Port zero cannot be advertised
    #[error("target port must be in the range 1-65535")]
    InvalidPort,

    /// A domain or host name is not a valid DNS name
    #[error("'{name}' is not a valid DNS name: {reason}")]
    InvalidName {
        /// The offending name
        name: String,
        /// Parser explanation
        reason: String,
    },

    /// An attribute key is empty, contains `=` or non-printable characters
    #[error("attribute key '{0}' must be non-empty printable ASCII without '='")]
    InvalidAttributeKey(String),

    /// A single encoded attribute does not fit in a TXT character-string
    #[error("attribute '{key}' encodes to {len} bytes, the limit is 255")]
    AttributeTooLong {
        /// Key of the oversized attribute
        key: String,
        /// Encoded length in bytes
        len: usize,
    },
}

/// One TXT attribute: a bare flag or a `key=value` pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Attribute {
    /// Boolean attribute, encoded as the bare key
    Flag(String),
    /// Key with a (possibly empty) binary value, encoded as `key=value`
    Pair(String, Vec<u8>),
}

impl Attribute {
    /// Attribute key
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Flag(key) | Self::Pair(key, _) => key,
        }
    }

    /// Encoded form used as one TXT character-string
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Flag(key) => key.as_bytes().to_vec(),
            Self::Pair(key, value) => {
                let mut out = Vec::with_capacity(key.len() + 1 + value.len());
                out.extend_from_slice(key.as_bytes());
                out.push(b'=');
                out.extend_from_slice(value);
                out
            }
        }
    }
}

/// An ordered set of attributes, published as one TXT record.
///
/// Order is preserved exactly; two sets with the same entries in a different
/// order encode differently and are therefore considered different.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<Attribute>,
}

impl Attributes {
    /// Create an empty attribute set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a boolean flag
    #[must_use]
    pub fn with_flag(mut self, key: &str) -> Self {
        self.entries.push(Attribute::Flag(key.to_string()));
        self
    }

    /// Add a `key=value` pair
    #[must_use]
    pub fn with_pair(mut self, key: &str, value: &[u8]) -> Self {
        self.entries
            .push(Attribute::Pair(key.to_string(), value.to_vec()));
        self
    }

    /// Entries in publication order
    #[must_use]
    pub fn entries(&self) -> &[Attribute] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// TXT character-strings for this set
    #[must_use]
    pub fn to_segments(&self) -> Vec<Vec<u8>> {
        self.entries.iter().map(Attribute::encode).collect()
    }
}

/// A DNS-SD service instance, immutable for the duration of one reconciliation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceInstance {
    /// Instance label (free-form text)
    pub name: String,
    /// Service type, e.g. `_http._tcp`
    pub service_type: String,
    /// Domain the instance is advertised in
    pub domain: String,
    /// Host the SRV record points at
    pub target_host: String,
    pub target_port: u16,
    pub priority: u16,
    pub weight: u16,
    /// One TXT record per attribute set
    pub attributes: Vec<Attributes>,
    pub ttl: Duration,
}

impl ServiceInstance {
    /// Fully qualified instance name, without a trailing dot
    #[must_use]
    pub fn instance_name(&self) -> String {
        format!(
            "{}.{}.{}",
            escape_instance_label(&self.name),
            self.service_type,
            trim_dot(&self.domain)
        )
    }

    /// Enumeration domain (owner of the PTR set), without a trailing dot
    #[must_use]
    pub fn enumeration_domain(&self) -> String {
        format!("{}.{}", self.service_type, trim_dot(&self.domain))
    }

    /// TTL in whole seconds, as carried by every record
    #[must_use]
    pub fn ttl_secs(&self) -> u32 {
        u32::try_from(self.ttl.as_secs()).unwrap_or(u32::MAX)
    }

    /// Check the invariants the record model relies on.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyField { field: "name" });
        }
        if self.target_host.is_empty() {
            return Err(ValidationError::EmptyField {
                field: "targetHost",
            });
        }
        if self.target_port == 0 {
            return Err(ValidationError::InvalidPort);
        }

        validate_service_type(&self.service_type)?;
        normalize_domain(&self.domain)?;
        normalize_domain(&self.target_host)?;

        for attrs in &self.attributes {
            for attr in attrs.entries() {
                let key = attr.key();
                if key.is_empty() || key.contains('=') || !key.bytes().all(|b| (0x20..0x7f).contains(&b))
                {
                    return Err(ValidationError::InvalidAttributeKey(key.to_string()));
                }
                let len = attr.encode().len();
                if len > MAX_TXT_SEGMENT_LEN {
                    return Err(ValidationError::AttributeTooLong {
                        key: key.to_string(),
                        len,
                    });
                }
            }
        }

        Ok(())
    }
}

impl TryFrom<&DNSSDServiceInstanceSpec> for ServiceInstance {
    type Error = ValidationError;

    fn try_from(spec: &DNSSDServiceInstanceSpec) -> Result<Self, Self::Error> {
        let ttl = match spec.ttl {
            Some(secs) if secs > 0 => secs,
            _ => DEFAULT_INSTANCE_TTL_SECS,
        };

        let attributes = spec
            .attributes
            .iter()
            .map(|set| {
                set.iter().fold(Attributes::new(), |attrs, (key, value)| {
                    if value.is_empty() {
                        attrs.with_flag(key)
                    } else {
                        attrs.with_pair(key, value.as_bytes())
                    }
                })
            })
            .collect();

        let instance = Self {
            name: spec.name.clone(),
            service_type: spec.service.clone(),
            domain: spec.domain.clone(),
            target_host: spec.target_host.clone(),
            target_port: spec.target_port,
            priority: spec.priority,
            weight: spec.weight,
            attributes,
            ttl: Duration::from_secs(u64::from(ttl)),
        };

        instance.validate()?;
        Ok(instance)
    }
}

fn validate_service_type(service_type: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::InvalidServiceType(service_type.to_string());

    let (service, proto) = service_type.split_once('.').ok_or_else(invalid)?;
    let service = service.strip_prefix('_').ok_or_else(invalid)?;

    if service.is_empty()
        || service.len() > 15
        || !service.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
    {
        return Err(invalid());
    }

    match proto {
        "_tcp" | "_udp" => Ok(()),
        _ => Err(invalid()),
    }
}

/// Escape an instance label for use in a presentation-format domain name.
///
/// `.` and `\` are backslash-escaped; space and bytes outside printable ASCII
/// are written as `\DDD`.
#[must_use]
pub fn escape_instance_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for byte in label.bytes() {
        match byte {
            b'.' | b'\\' => {
                out.push('\\');
                out.push(char::from(byte));
            }
            0x21..=0x7e => out.push(char::from(byte)),
            _ => {
                let _ = write!(out, "\\{byte:03}");
            }
        }
    }
    out
}

/// Normalize a domain for comparison: validated, lower-case, no trailing dot.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidName`] if the name is empty or not a valid
/// DNS name (label or total length limits, empty labels).
pub fn normalize_domain(domain: &str) -> Result<String, ValidationError> {
    let trimmed = trim_dot(domain.trim());
    if trimmed.is_empty() {
        return Err(ValidationError::InvalidName {
            name: domain.to_string(),
            reason: "name is empty".to_string(),
        });
    }

    if trimmed.split('.').any(str::is_empty) {
        return Err(ValidationError::InvalidName {
            name: domain.to_string(),
            reason: "name contains an empty label".to_string(),
        });
    }

    let name = Name::from_ascii(trimmed).map_err(|e| ValidationError::InvalidName {
        name: domain.to_string(),
        reason: e.to_string(),
    })?;

    Ok(trim_dot(&name.to_lowercase().to_ascii()).to_string())
}

/// The domain itself followed by each of its ancestors, most specific first.
///
/// `a.example.com` yields `a.example.com`, `example.com`, `com`.
///
/// # Errors
///
/// Returns an error if `domain` is not a valid DNS name.
pub fn domain_ancestors(domain: &str) -> Result<Vec<String>, ValidationError> {
    let normalized = normalize_domain(domain)?;
    let name = Name::from_ascii(&normalized).map_err(|e| ValidationError::InvalidName {
        name: domain.to_string(),
        reason: e.to_string(),
    })?;

    Ok((1..=usize::from(name.num_labels()))
        .rev()
        .map(|labels| trim_dot(&name.trim_to(labels).to_ascii()).to_string())
        .collect())
}

/// Compare two domain names ignoring ASCII case and a trailing dot.
#[must_use]
pub fn names_equal(a: &str, b: &str) -> bool {
    trim_dot(a).eq_ignore_ascii_case(trim_dot(b))
}

/// Name relative to `zone`, or `None` if `name` is not inside `zone`.
///
/// The zone apex is returned as an empty string.
#[must_use]
pub fn relative_name(name: &str, zone: &str) -> Option<String> {
    let name = trim_dot(name);
    let zone = trim_dot(zone);

    if name.eq_ignore_ascii_case(zone) {
        return Some(String::new());
    }

    let split = name.len().checked_sub(zone.len() + 1)?;
    let (prefix, suffix) = name.split_at(split);
    let suffix = suffix.strip_prefix('.')?;

    // A dot preceded by a backslash belongs to the instance label.
    if prefix.ends_with('\\') && !prefix.ends_with("\\\\") {
        return None;
    }

    suffix.eq_ignore_ascii_case(zone).then(|| prefix.to_string())
}

/// Absolute (dot-terminated) form of a name
#[must_use]
pub fn fqdn(name: &str) -> String {
    format!("{}.", trim_dot(name))
}

fn trim_dot(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
