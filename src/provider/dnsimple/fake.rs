// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory DNSimple account for tests.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use std::sync::Mutex;

use super::client::{DnsimpleApi, RecordAttributes, Zone, ZoneRecord};
use crate::dnssd::RecordType;
use crate::provider::http::ApiError;

pub(crate) const ACCOUNT_ID: u64 = 1010;

#[derive(Default)]
pub(crate) struct State {
    pub zones: Vec<Zone>,
    /// Records with the name of the zone holding them
    pub records: Vec<(String, ZoneRecord)>,
    pub next_id: u64,
    /// Write operations in the order received, e.g. `delete SRV`
    pub writes: Vec<String>,
    pub calls: usize,
    /// Every call fails with this status when set
    pub fail_with: Option<StatusCode>,
}

#[derive(Default)]
pub(crate) struct FakeDnsimple {
    pub state: Mutex<State>,
}

fn status_error(status: StatusCode, message: &str) -> ApiError {
    ApiError::Status {
        method: Method::GET,
        url: "https://api.dnsimple.test/v2/fake".to_string(),
        status,
        message: message.to_string(),
    }
}

impl FakeDnsimple {
    pub fn with_zone(name: &str) -> Self {
        let fake = Self::default();
        fake.add_zone(name);
        fake
    }

    pub fn add_zone(&self, name: &str) {
        let mut state = self.state.lock().unwrap();
        let id = state.zones.len() as u64 + 1;
        state.zones.push(Zone {
            id,
            account_id: ACCOUNT_ID,
            name: name.to_string(),
        });
    }

    /// Insert a record directly, bypassing the write log
    pub fn put_record(&self, zone: &str, record: RecordAttributes) -> u64 {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        state.records.push((zone.to_string(), to_record(id, &record)));
        id
    }

    /// Records at relative `name` of `record_type`, ordered by id
    pub fn records(&self, zone: &str, name: &str, record_type: RecordType) -> Vec<ZoneRecord> {
        let state = self.state.lock().unwrap();
        let mut found: Vec<ZoneRecord> = state
            .records
            .iter()
            .filter(|(z, r)| {
                z == zone && r.name.eq_ignore_ascii_case(name) && r.record_type == record_type.as_str()
            })
            .map(|(_, r)| r.clone())
            .collect();
        found.sort_by_key(|r| r.id);
        found
    }

    pub fn fail_with(&self, status: StatusCode) {
        self.state.lock().unwrap().fail_with = Some(status);
    }

    pub fn writes(&self) -> Vec<String> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }

    fn begin(&self) -> Result<std::sync::MutexGuard<'_, State>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        match state.fail_with {
            Some(status) => Err(status_error(status, "injected failure")),
            None => Ok(state),
        }
    }
}

fn to_record(id: u64, attributes: &RecordAttributes) -> ZoneRecord {
    ZoneRecord {
        id,
        name: attributes.name.clone(),
        record_type: attributes.record_type.clone(),
        content: attributes.content.clone(),
        ttl: attributes.ttl,
        priority: attributes.priority,
    }
}

#[async_trait]
impl DnsimpleApi for FakeDnsimple {
    async fn get_zone(&self, zone: &str) -> Result<Option<Zone>, ApiError> {
        let state = self.begin()?;
        Ok(state
            .zones
            .iter()
            .find(|z| z.name.eq_ignore_ascii_case(zone))
            .cloned())
    }

    async fn list_records(
        &self,
        zone: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<Vec<ZoneRecord>, ApiError> {
        drop(self.begin()?);
        Ok(self.records(zone, name, record_type))
    }

    async fn create_record(
        &self,
        zone: &str,
        record: &RecordAttributes,
    ) -> Result<ZoneRecord, ApiError> {
        let mut state = self.begin()?;
        state.next_id += 1;
        let created = to_record(state.next_id, record);
        state.records.push((zone.to_string(), created.clone()));
        state.writes.push(format!("create {}", record.record_type));
        Ok(created)
    }

    async fn update_record(
        &self,
        zone: &str,
        id: u64,
        record: &RecordAttributes,
    ) -> Result<ZoneRecord, ApiError> {
        let mut state = self.begin()?;
        let updated = to_record(id, record);
        let slot = state
            .records
            .iter_mut()
            .find(|(z, r)| z == zone && r.id == id)
            .ok_or_else(|| status_error(StatusCode::NOT_FOUND, "record not found"))?;
        slot.1 = updated.clone();
        state.writes.push(format!("update {}", record.record_type));
        Ok(updated)
    }

    async fn delete_record(&self, zone: &str, id: u64) -> Result<(), ApiError> {
        let mut state = self.begin()?;
        let index = state
            .records
            .iter()
            .position(|(z, r)| z == zone && r.id == id)
            .ok_or_else(|| status_error(StatusCode::NOT_FOUND, "record not found"))?;
        let (_, removed) = state.records.remove(index);
        state.writes.push(format!("delete {}", removed.record_type));
        Ok(())
    }
}
