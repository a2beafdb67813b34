// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Google Cloud DNS v1 API surface used by the advertiser.
//!
//! Only the calls the operator needs are modelled: managed-zone lookup,
//! record-set listing by exact name and type, change submission and change
//! polling. The [`CloudDnsApi`] trait lets tests substitute an in-memory zone.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::dnssd::RecordType;
use crate::provider::auth::TokenSource;
use crate::provider::http::{ApiClient, ApiError};

/// A Cloud DNS managed zone.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManagedZone {
    /// Numeric identifier, stable across renames
    pub id: String,
    /// User-assigned zone name
    pub name: String,
    /// Zone apex, dot-terminated
    pub dns_name: String,
    /// `public` or `private`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
}

impl ManagedZone {
    #[must_use]
    pub fn is_private(&self) -> bool {
        self.visibility.as_deref() == Some("private")
    }
}

/// A record set: every record of one name and type.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecordSet {
    /// Owner name, dot-terminated
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub ttl: u32,
    /// Record data in presentation form, one entry per record
    pub rrdatas: Vec<String>,
}

/// Propagation state of a submitted change.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Pending,
    Done,
}

/// An atomic set of record-set deletions and additions.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ZoneChange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ChangeStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additions: Vec<ResourceRecordSet>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deletions: Vec<ResourceRecordSet>,
}

impl ZoneChange {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.deletions.is_empty()
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.status == Some(ChangeStatus::Done)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManagedZonesList {
    #[serde(default)]
    managed_zones: Vec<ManagedZone>,
}

#[derive(Debug, Deserialize)]
struct RecordSetsList {
    #[serde(default)]
    rrsets: Vec<ResourceRecordSet>,
}

/// Cloud DNS operations used by the provider, scoped to one project.
#[async_trait]
pub trait CloudDnsApi: Send + Sync {
    /// Zones whose apex is exactly `dns_name` (dot-terminated)
    async fn find_zones(&self, dns_name: &str) -> Result<Vec<ManagedZone>, ApiError>;

    /// Zone by name or numeric id; `None` if it does not exist
    async fn get_zone(&self, zone: &str) -> Result<Option<ManagedZone>, ApiError>;

    /// The record set at `name` (dot-terminated) of `record_type`, if any
    async fn get_rrset(
        &self,
        zone: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<Option<ResourceRecordSet>, ApiError>;

    /// Submit a change; the response carries its id and initial status
    async fn create_change(&self, zone: &str, change: &ZoneChange) -> Result<ZoneChange, ApiError>;

    /// Current state of a submitted change
    async fn get_change(&self, zone: &str, change_id: &str) -> Result<ZoneChange, ApiError>;
}

/// [`CloudDnsApi`] over HTTPS.
#[derive(Clone, Debug)]
pub struct CloudDnsClient {
    api: ApiClient,
    project: String,
}

impl CloudDnsClient {
    /// Client for `project`, authenticating with OAuth2 access tokens from `tokens`.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid URL.
    pub fn new(
        base_url: &str,
        project: &str,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            api: ApiClient::new(base_url, tokens)?,
            project: project.to_string(),
        })
    }

    fn zones_path(&self) -> String {
        format!("projects/{}/managedZones", self.project)
    }
}

#[async_trait]
impl CloudDnsApi for CloudDnsClient {
    async fn find_zones(&self, dns_name: &str) -> Result<Vec<ManagedZone>, ApiError> {
        let list: ManagedZonesList = self
            .api
            .get(&self.zones_path(), &[("dnsName", dns_name)])
            .await?;
        Ok(list.managed_zones)
    }

    async fn get_zone(&self, zone: &str) -> Result<Option<ManagedZone>, ApiError> {
        self.api
            .get_optional(&format!("{}/{zone}", self.zones_path()), &[])
            .await
    }

    async fn get_rrset(
        &self,
        zone: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<Option<ResourceRecordSet>, ApiError> {
        let list: RecordSetsList = self
            .api
            .get(
                &format!("{}/{zone}/rrsets", self.zones_path()),
                &[("name", name), ("type", record_type.as_str())],
            )
            .await?;

        Ok(list
            .rrsets
            .into_iter()
            .find(|set| set.record_type == record_type.as_str()))
    }

    async fn create_change(&self, zone: &str, change: &ZoneChange) -> Result<ZoneChange, ApiError> {
        self.api
            .post(&format!("{}/{zone}/changes", self.zones_path()), change)
            .await
    }

    async fn get_change(&self, zone: &str, change_id: &str) -> Result<ZoneChange, ApiError> {
        self.api
            .get(&format!("{}/{zone}/changes/{change_id}", self.zones_path()), &[])
            .await
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod client_tests;
