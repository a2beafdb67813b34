// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNSimple v2 API surface used by the advertiser.
//!
//! Zone lookup by name, record listing filtered by relative name and type,
//! and per-record create, update and delete. Every call is scoped to one
//! account.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::constants::DNSIMPLE_PAGE_SIZE;
use crate::dnssd::RecordType;
use crate::provider::auth::StaticToken;
use crate::provider::http::{ApiClient, ApiError};

/// A zone hosted in a DNSimple account.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Zone {
    pub id: u64,
    pub account_id: u64,
    /// Zone apex, without a trailing dot
    pub name: String,
}

/// A single record in a zone.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ZoneRecord {
    pub id: u64,
    /// Name relative to the zone; empty at the apex
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub content: String,
    pub ttl: u32,
    #[serde(default)]
    pub priority: Option<u16>,
}

impl ZoneRecord {
    /// The attributes this record would be written with
    #[must_use]
    pub fn attributes(&self) -> RecordAttributes {
        RecordAttributes {
            name: self.name.clone(),
            record_type: self.record_type.clone(),
            content: self.content.clone(),
            ttl: self.ttl,
            priority: self.priority,
        }
    }
}

/// Body of a record create or update.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordAttributes {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub content: String,
    pub ttl: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    current_page: u32,
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct RecordPage {
    data: Vec<ZoneRecord>,
    pagination: Pagination,
}

/// DNSimple operations used by the provider, scoped to one account.
#[async_trait]
pub trait DnsimpleApi: Send + Sync {
    /// Zone named exactly `zone`; `None` if the account does not host it
    async fn get_zone(&self, zone: &str) -> Result<Option<Zone>, ApiError>;

    /// Every record at relative `name` of `record_type`, ordered by record id
    async fn list_records(
        &self,
        zone: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<Vec<ZoneRecord>, ApiError>;

    async fn create_record(
        &self,
        zone: &str,
        record: &RecordAttributes,
    ) -> Result<ZoneRecord, ApiError>;

    async fn update_record(
        &self,
        zone: &str,
        id: u64,
        record: &RecordAttributes,
    ) -> Result<ZoneRecord, ApiError>;

    async fn delete_record(&self, zone: &str, id: u64) -> Result<(), ApiError>;
}

/// [`DnsimpleApi`] over HTTPS.
#[derive(Clone, Debug)]
pub struct DnsimpleClient {
    api: ApiClient,
    account: String,
}

impl DnsimpleClient {
    /// Client for `account`, authenticating with an API access token.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid URL.
    pub fn new(base_url: &str, account: &str, token: &str) -> Result<Self, ApiError> {
        Ok(Self {
            api: ApiClient::new(base_url, Arc::new(StaticToken::new(token)))?,
            account: account.to_string(),
        })
    }

    fn records_path(&self, zone: &str) -> String {
        format!("{}/zones/{zone}/records", self.account)
    }
}

#[async_trait]
impl DnsimpleApi for DnsimpleClient {
    async fn get_zone(&self, zone: &str) -> Result<Option<Zone>, ApiError> {
        let found: Option<Envelope<Zone>> = self
            .api
            .get_optional(&format!("{}/zones/{zone}", self.account), &[])
            .await?;
        Ok(found.map(|envelope| envelope.data))
    }

    async fn list_records(
        &self,
        zone: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<Vec<ZoneRecord>, ApiError> {
        let per_page = DNSIMPLE_PAGE_SIZE.to_string();
        let mut records = Vec::new();
        let mut page = 1u32;

        loop {
            let page_param = page.to_string();
            let response: RecordPage = self
                .api
                .get(
                    &self.records_path(zone),
                    &[
                        ("name", name),
                        ("type", record_type.as_str()),
                        ("sort", "id:asc"),
                        ("per_page", per_page.as_str()),
                        ("page", page_param.as_str()),
                    ],
                )
                .await?;

            records.extend(response.data);

            if response.pagination.current_page >= response.pagination.total_pages {
                break;
            }
            page = response.pagination.current_page + 1;
        }

        debug!(
            zone = %zone,
            name = %name,
            record_type = %record_type,
            count = records.len(),
            "Listed DNSimple records"
        );

        // The name filter is a prefix match on some API versions
        records.retain(|r| r.name.eq_ignore_ascii_case(name));
        records.sort_by_key(|r| r.id);
        Ok(records)
    }

    async fn create_record(
        &self,
        zone: &str,
        record: &RecordAttributes,
    ) -> Result<ZoneRecord, ApiError> {
        let created: Envelope<ZoneRecord> = self.api.post(&self.records_path(zone), record).await?;
        Ok(created.data)
    }

    async fn update_record(
        &self,
        zone: &str,
        id: u64,
        record: &RecordAttributes,
    ) -> Result<ZoneRecord, ApiError> {
        let updated: Envelope<ZoneRecord> = self
            .api
            .patch(&format!("{}/{id}", self.records_path(zone)), record)
            .await?;
        Ok(updated.data)
    }

    async fn delete_record(&self, zone: &str, id: u64) -> Result<(), ApiError> {
        self.api
            .delete(&format!("{}/{id}", self.records_path(zone)))
            .await
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod client_tests;
