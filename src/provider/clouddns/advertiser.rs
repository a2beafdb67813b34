// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cloud DNS advertiser: one atomic change per instance, then a propagation
//! wait until the change is live.

use async_trait::async_trait;
use serde::de::Error as _;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::client::{CloudDnsApi, ManagedZone, ResourceRecordSet, ZoneChange};
use crate::dnssd::{
    desired_records, fqdn, names_equal, DesiredRecords, Record, RecordData, RecordType,
    ServiceInstance, SrvData, TxtData,
};
use crate::provider::diff::{plan_advertise, plan_unadvertise, ExistingRecords};
use crate::provider::http::ApiError;
use crate::provider::{Advertiser, Change, ChangeSet, ProviderError};
use crate::reconcilers::retry::BackoffPolicy;

/// Record sets currently at the instance's names.
#[derive(Debug, Default)]
struct CurrentSets {
    ptr: Option<ResourceRecordSet>,
    srv: Option<ResourceRecordSet>,
    txt: Option<ResourceRecordSet>,
}

impl CurrentSets {
    fn existing(&self) -> ExistingRecords {
        ExistingRecords {
            ptr: self.ptr.as_ref().map(to_records).unwrap_or_default(),
            srv: self.srv.as_ref().map(to_records).unwrap_or_default(),
            txt: self.txt.as_ref().map(to_records).unwrap_or_default(),
        }
    }
}

/// Advertiser bound to one managed zone.
pub struct CloudDnsAdvertiser {
    api: Arc<dyn CloudDnsApi>,
    zone: ManagedZone,
    propagation: BackoffPolicy,
}

impl CloudDnsAdvertiser {
    pub(crate) fn new(api: Arc<dyn CloudDnsApi>, zone: ManagedZone, propagation: BackoffPolicy) -> Self {
        Self {
            api,
            zone,
            propagation,
        }
    }

    async fn current_sets(&self, instance: &ServiceInstance) -> Result<CurrentSets, ProviderError> {
        let enumeration = fqdn(&instance.enumeration_domain());
        let instance_name = fqdn(&instance.instance_name());

        Ok(CurrentSets {
            ptr: self.get_rrset(&enumeration, RecordType::PTR).await?,
            srv: self.get_rrset(&instance_name, RecordType::SRV).await?,
            txt: self.get_rrset(&instance_name, RecordType::TXT).await?,
        })
    }

    async fn get_rrset(
        &self,
        name: &str,
        record_type: RecordType,
    ) -> Result<Option<ResourceRecordSet>, ProviderError> {
        self.api
            .get_rrset(&self.zone.id, name, record_type)
            .await
            .map_err(ProviderError::api("list", record_type.as_str(), &self.zone.dns_name))
    }

    /// Submit `change` and block until Cloud DNS reports it as done.
    async fn apply(&self, change: &ZoneChange) -> Result<(), ProviderError> {
        let submitted = self
            .api
            .create_change(&self.zone.id, change)
            .await
            .map_err(ProviderError::api("submit change for", "PTR/SRV/TXT", &self.zone.dns_name))?;

        let Some(change_id) = submitted.id.clone() else {
            if submitted.is_done() {
                debug!(zone = %self.zone.dns_name, "Submitted Cloud DNS change applied immediately");
                return Ok(());
            }
            return Err(ProviderError::api("submit change for", "PTR/SRV/TXT", &self.zone.dns_name)(
                ApiError::Decode {
                    url: format!("managedZones/{}/changes", self.zone.id),
                    source: serde_json::Error::missing_field("id"),
                },
            ));
        };
        debug!(
            zone = %self.zone.dns_name,
            change_id = %change_id,
            status = ?submitted.status,
            "Submitted Cloud DNS change"
        );

        self.wait_for_propagation(submitted, &change_id).await
    }

    /// Poll a change with capped exponential backoff until it is done.
    ///
    /// Cancellation by the caller drops this future at the next await.
    async fn wait_for_propagation(
        &self,
        mut change: ZoneChange,
        change_id: &str,
    ) -> Result<(), ProviderError> {
        let start = Instant::now();
        let mut attempt = 0;

        while !change.is_done() {
            if self.propagation.is_exhausted(start.elapsed()) {
                warn!(
                    zone = %self.zone.dns_name,
                    change_id = %change_id,
                    elapsed = ?start.elapsed(),
                    "Cloud DNS change still pending at propagation deadline"
                );
                return Err(ProviderError::PropagationTimeout {
                    zone: self.zone.dns_name.clone(),
                    change_id: change_id.to_string(),
                    elapsed: start.elapsed(),
                });
            }

            tokio::time::sleep(self.propagation.delay(attempt)).await;
            attempt += 1;

            change = self
                .api
                .get_change(&self.zone.id, change_id)
                .await
                .map_err(ProviderError::api("poll change for", "PTR/SRV/TXT", &self.zone.dns_name))?;
        }

        debug!(
            zone = %self.zone.dns_name,
            change_id = %change_id,
            polls = attempt,
            elapsed = ?start.elapsed(),
            "Cloud DNS change propagated"
        );
        Ok(())
    }
}

#[async_trait]
impl Advertiser for CloudDnsAdvertiser {
    fn id(&self) -> &str {
        &self.zone.id
    }

    fn zone_name(&self) -> &str {
        self.zone.dns_name.trim_end_matches('.')
    }

    async fn advertise(&self, instance: &ServiceInstance) -> Result<ChangeSet, ProviderError> {
        instance.validate()?;

        let desired = desired_records(instance);
        let current = self.current_sets(instance).await?;
        let plan = plan_advertise(&current.existing(), &desired);

        let change = advertise_change(&current, &desired, &plan);
        if change.is_empty() {
            return Ok(plan);
        }

        info!(
            zone = %self.zone.dns_name,
            instance = %desired.srv.name,
            changes = %plan,
            "Advertising instance in Cloud DNS"
        );
        self.apply(&change).await?;
        Ok(plan)
    }

    async fn unadvertise(&self, instance: &ServiceInstance) -> Result<ChangeSet, ProviderError> {
        let instance_name = instance.instance_name();
        let current = self.current_sets(instance).await?;
        let plan = plan_unadvertise(&current.existing(), &instance_name);

        let change = unadvertise_change(&current, &instance_name, &plan);
        if change.is_empty() {
            return Ok(plan);
        }

        info!(
            zone = %self.zone.dns_name,
            instance = %instance_name,
            changes = %plan,
            "Unadvertising instance from Cloud DNS"
        );
        self.apply(&change).await?;
        Ok(plan)
    }
}

/// Build the change that turns `current` into `desired` according to `plan`.
fn advertise_change(
    current: &CurrentSets,
    desired: &DesiredRecords,
    plan: &ChangeSet,
) -> ZoneChange {
    let mut change = ZoneChange::default();
    let instance_name = &desired.srv.name;
    let ttl = desired.srv.ttl;

    if plan.ptr == Change::Created {
        let entry = desired.ptr.data.presentation();
        match &current.ptr {
            Some(existing) => {
                let mut appended = existing.clone();
                appended.rrdatas.push(entry);
                change.deletions.push(existing.clone());
                change.additions.push(appended);
            }
            None => change.additions.push(rrset(
                &desired.ptr.name,
                RecordType::PTR,
                desired.ptr.ttl,
                vec![entry],
            )),
        }
    }

    if plan.srv != Change::None {
        change.deletions.extend(current.srv.clone());
        change.additions.push(rrset(
            instance_name,
            RecordType::SRV,
            ttl,
            vec![desired.srv.data.presentation()],
        ));
    }

    if plan.txt != Change::None {
        change.deletions.extend(current.txt.clone());
        change.additions.push(rrset(
            instance_name,
            RecordType::TXT,
            ttl,
            desired.txt.iter().map(|r| r.data.presentation()).collect(),
        ));
    }

    change
}

/// Build the change that removes the instance according to `plan`.
fn unadvertise_change(current: &CurrentSets, instance_name: &str, plan: &ChangeSet) -> ZoneChange {
    let mut change = ZoneChange::default();

    if plan.ptr == Change::Deleted {
        if let Some(existing) = &current.ptr {
            let remaining: Vec<String> = existing
                .rrdatas
                .iter()
                .filter(|data| !names_equal(data, instance_name))
                .cloned()
                .collect();

            change.deletions.push(existing.clone());
            if !remaining.is_empty() {
                change.additions.push(ResourceRecordSet {
                    rrdatas: remaining,
                    ..existing.clone()
                });
            }
        }
    }

    if plan.srv == Change::Deleted {
        change.deletions.extend(current.srv.clone());
    }
    if plan.txt == Change::Deleted {
        change.deletions.extend(current.txt.clone());
    }

    change
}

fn rrset(name: &str, record_type: RecordType, ttl: u32, rrdatas: Vec<String>) -> ResourceRecordSet {
    ResourceRecordSet {
        name: fqdn(name),
        record_type: record_type.as_str().to_string(),
        ttl,
        rrdatas,
    }
}

/// Convert a record set into records.
///
/// Data that cannot be parsed is kept as an opaque TXT value so it never
/// compares equal to desired data and the set gets replaced.
fn to_records(set: &ResourceRecordSet) -> Vec<Record> {
    let name = set.name.trim_end_matches('.').to_string();

    set.rrdatas
        .iter()
        .map(|raw| {
            let parsed = match set.record_type.as_str() {
                "PTR" => Ok(RecordData::PTR(raw.trim_end_matches('.').to_string())),
                "SRV" => SrvData::parse(raw).map(RecordData::SRV),
                _ => TxtData::parse(raw).map(RecordData::TXT),
            };

            let data = parsed.unwrap_or_else(|e| {
                warn!(name = %set.name, error = %e, "Unparsable record data in Cloud DNS");
                RecordData::TXT(TxtData::new(vec![raw.as_bytes().to_vec()]))
            });

            Record {
                name: name.clone(),
                ttl: set.ttl,
                data,
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "advertiser_tests.rs"]
mod advertiser_tests;
