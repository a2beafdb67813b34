// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory Cloud DNS project for tests.
//!
//! Changes are checked the way Cloud DNS checks them: a deletion must match
//! the current record set exactly and an addition must not collide with an
//! existing set.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use super::client::{ChangeStatus, CloudDnsApi, ManagedZone, ResourceRecordSet, ZoneChange};
use crate::dnssd::RecordType;
use crate::provider::http::ApiError;

type RrsetKey = (String, String, String);

#[derive(Default)]
pub(crate) struct State {
    pub zones: Vec<ManagedZone>,
    pub rrsets: BTreeMap<RrsetKey, ResourceRecordSet>,
    /// Polls a new change stays pending for
    pub pending_polls: u32,
    /// Remaining pending polls per change id
    pub changes: HashMap<String, u32>,
    pub submitted: Vec<ZoneChange>,
    pub get_change_calls: usize,
    pub calls: usize,
    /// Every call fails with this status when set
    pub fail_with: Option<StatusCode>,
    /// Accepted changes come back without an id when set
    pub omit_change_id: bool,
}

#[derive(Default)]
pub(crate) struct FakeCloudDns {
    pub state: Mutex<State>,
}

fn key(zone: &str, name: &str, record_type: &str) -> RrsetKey {
    (
        zone.to_string(),
        name.trim_end_matches('.').to_ascii_lowercase(),
        record_type.to_string(),
    )
}

fn status_error(status: StatusCode, message: &str) -> ApiError {
    ApiError::Status {
        method: Method::POST,
        url: "https://dns.googleapis.test/fake".to_string(),
        status,
        message: message.to_string(),
    }
}

impl FakeCloudDns {
    pub fn with_zone(id: &str, dns_name: &str) -> Self {
        let fake = Self::default();
        fake.add_zone(id, dns_name, "public");
        fake
    }

    pub fn add_zone(&self, id: &str, dns_name: &str, visibility: &str) {
        self.state.lock().unwrap().zones.push(ManagedZone {
            id: id.to_string(),
            name: format!("zone-{id}"),
            dns_name: dns_name.to_string(),
            visibility: Some(visibility.to_string()),
        });
    }

    pub fn rrset(&self, zone: &str, name: &str, record_type: RecordType) -> Option<ResourceRecordSet> {
        self.state
            .lock()
            .unwrap()
            .rrsets
            .get(&key(zone, name, record_type.as_str()))
            .cloned()
    }

    pub fn put_rrset(&self, zone: &str, set: ResourceRecordSet) {
        self.state
            .lock()
            .unwrap()
            .rrsets
            .insert(key(zone, &set.name, &set.record_type), set);
    }

    pub fn set_pending_polls(&self, polls: u32) {
        self.state.lock().unwrap().pending_polls = polls;
    }

    pub fn fail_with(&self, status: StatusCode) {
        self.state.lock().unwrap().fail_with = Some(status);
    }

    pub fn omit_change_ids(&self) {
        self.state.lock().unwrap().omit_change_id = true;
    }

    pub fn submitted(&self) -> Vec<ZoneChange> {
        self.state.lock().unwrap().submitted.clone()
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

#[async_trait]
impl CloudDnsApi for FakeCloudDns {
    async fn find_zones(&self, dns_name: &str) -> Result<Vec<ManagedZone>, ApiError> {
        let state = self.begin()?;
        Ok(state
            .zones
            .iter()
            .filter(|z| z.dns_name.eq_ignore_ascii_case(dns_name))
            .cloned()
            .collect())
    }

    async fn get_zone(&self, zone: &str) -> Result<Option<ManagedZone>, ApiError> {
        let state = self.begin()?;
        Ok(state
            .zones
            .iter()
            .find(|z| z.id == zone || z.name == zone)
            .cloned())
    }

    async fn get_rrset(
        &self,
        zone: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<Option<ResourceRecordSet>, ApiError> {
        let state = self.begin()?;
        Ok(state
            .rrsets
            .get(&key(zone, name, record_type.as_str()))
            .cloned())
    }

    async fn create_change(&self, zone: &str, change: &ZoneChange) -> Result<ZoneChange, ApiError> {
        let mut state = self.begin()?;

        for deletion in &change.deletions {
            let current = state
                .rrsets
                .get(&key(zone, &deletion.name, &deletion.record_type));
            if current != Some(deletion) {
                return Err(status_error(StatusCode::PRECONDITION_FAILED, "conditionNotMet"));
            }
        }

        let deleted: Vec<RrsetKey> = change
            .deletions
            .iter()
            .map(|d| key(zone, &d.name, &d.record_type))
            .collect();

        for addition in &change.additions {
            let k = key(zone, &addition.name, &addition.record_type);
            if state.rrsets.contains_key(&k) && !deleted.contains(&k) {
                return Err(status_error(StatusCode::CONFLICT, "alreadyExists"));
            }
        }

        for k in &deleted {
            state.rrsets.remove(k);
        }
        for addition in &change.additions {
            state.rrsets.insert(
                key(zone, &addition.name, &addition.record_type),
                addition.clone(),
            );
        }

        let id = state.submitted.len().to_string();
        let pending = state.pending_polls;
        state.changes.insert(id.clone(), pending);
        state.submitted.push(change.clone());

        Ok(ZoneChange {
            id: (!state.omit_change_id).then_some(id),
            status: Some(if pending == 0 {
                ChangeStatus::Done
            } else {
                ChangeStatus::Pending
            }),
            ..change.clone()
        })
    }

    async fn get_change(&self, _zone: &str, change_id: &str) -> Result<ZoneChange, ApiError> {
        let mut state = self.begin()?;
        state.get_change_calls += 1;

        let remaining = state
            .changes
            .get_mut(change_id)
            .ok_or_else(|| status_error(StatusCode::NOT_FOUND, "change not found"))?;
        *remaining = remaining.saturating_sub(1);
        let done = *remaining == 0;

        Ok(ZoneChange {
            id: Some(change_id.to_string()),
            status: Some(if done {
                ChangeStatus::Done
            } else {
                ChangeStatus::Pending
            }),
            ..Default::default()
        })
    }
}
