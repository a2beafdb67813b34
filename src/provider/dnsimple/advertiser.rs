// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNSimple advertiser: per-record writes, applied delete, update, create.
//!
//! DNSimple serves record changes as soon as the API call returns, so there is
//! no propagation wait.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::client::{DnsimpleApi, RecordAttributes, Zone, ZoneRecord};
use crate::dnssd::{
    desired_records, names_equal, relative_name, DesiredRecords, Record, RecordData, RecordType,
    ServiceInstance, SrvData, TxtData, ValidationError,
};
use crate::provider::diff::{pair_records, plan_advertise, plan_unadvertise, ExistingRecords};
use crate::provider::{Advertiser, Change, ChangeSet, ProviderError};

/// Records currently at the instance's names, as returned by the API.
#[derive(Debug, Default)]
struct CurrentRecords {
    ptr: Vec<ZoneRecord>,
    srv: Vec<ZoneRecord>,
    txt: Vec<ZoneRecord>,
}

/// Writes to apply, grouped in the order they are sent.
#[derive(Debug, Default)]
struct Writes {
    deletes: Vec<ZoneRecord>,
    updates: Vec<(ZoneRecord, RecordAttributes)>,
    creates: Vec<RecordAttributes>,
}

impl Writes {
    fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.updates.is_empty() && self.creates.is_empty()
    }
}

/// Advertiser bound to one DNSimple zone.
pub struct DnsimpleAdvertiser {
    api: Arc<dyn DnsimpleApi>,
    zone: Zone,
    id: String,
}

impl DnsimpleAdvertiser {
    pub(crate) fn new(api: Arc<dyn DnsimpleApi>, zone: Zone) -> Self {
        let id = format!("{}/{}", zone.account_id, zone.name);
        Self { api, zone, id }
    }

    /// Zone-relative form of `name`.
    fn relative(&self, name: &str) -> Result<String, ProviderError> {
        relative_name(name, &self.zone.name).ok_or_else(|| {
            ProviderError::InvalidInstance(ValidationError::InvalidName {
                name: name.to_string(),
                reason: format!("not inside zone '{}'", self.zone.name),
            })
        })
    }

    async fn current_records(&self, instance: &ServiceInstance) -> Result<CurrentRecords, ProviderError> {
        let enumeration = self.relative(&instance.enumeration_domain())?;
        let instance_name = self.relative(&instance.instance_name())?;

        Ok(CurrentRecords {
            ptr: self.list(&enumeration, RecordType::PTR).await?,
            srv: self.list(&instance_name, RecordType::SRV).await?,
            txt: self.list(&instance_name, RecordType::TXT).await?,
        })
    }

    async fn list(&self, name: &str, record_type: RecordType) -> Result<Vec<ZoneRecord>, ProviderError> {
        self.api
            .list_records(&self.zone.name, name, record_type)
            .await
            .map_err(ProviderError::api("list", record_type.as_str(), &self.zone.name))
    }

    fn existing(&self, current: &CurrentRecords) -> ExistingRecords {
        ExistingRecords {
            ptr: current.ptr.iter().map(|r| self.to_record(r)).collect(),
            srv: current.srv.iter().map(|r| self.to_record(r)).collect(),
            txt: current.txt.iter().map(|r| self.to_record(r)).collect(),
        }
    }

    /// Convert an API record into the model.
    ///
    /// Content that cannot be parsed is kept as an opaque TXT value so it
    /// never matches desired data and gets rewritten.
    fn to_record(&self, record: &ZoneRecord) -> Record {
        let name = if record.name.is_empty() {
            self.zone.name.clone()
        } else {
            format!("{}.{}", record.name, self.zone.name)
        };

        let parsed = match record.record_type.as_str() {
            "PTR" => Ok(RecordData::PTR(record.content.trim_end_matches('.').to_string())),
            "SRV" => SrvData::parse(&format!(
                "{} {}",
                record.priority.unwrap_or_default(),
                record.content
            ))
            .map(RecordData::SRV),
            _ => TxtData::parse(&record.content).map(RecordData::TXT),
        };

        let data = parsed.unwrap_or_else(|e| {
            warn!(
                zone = %self.zone.name,
                record_id = record.id,
                error = %e,
                "Unparsable record content in DNSimple"
            );
            RecordData::TXT(TxtData::new(vec![record.content.as_bytes().to_vec()]))
        });

        Record {
            name,
            ttl: record.ttl,
            data,
        }
    }

    fn attributes(&self, record: &Record) -> Result<RecordAttributes, ProviderError> {
        let name = self.relative(&record.name)?;
        let (content, priority) = match &record.data {
            RecordData::PTR(target) => (target.clone(), None),
            RecordData::SRV(srv) => (
                format!("{} {} {}", srv.weight, srv.port, srv.target.trim_end_matches('.')),
                Some(srv.priority),
            ),
            RecordData::TXT(txt) => (txt.presentation(), None),
        };

        Ok(RecordAttributes {
            name,
            record_type: record.data.record_type().as_str().to_string(),
            content,
            ttl: record.ttl,
            priority,
        })
    }

    fn advertise_writes(
        &self,
        current: &CurrentRecords,
        desired: &DesiredRecords,
        plan: &ChangeSet,
    ) -> Result<Writes, ProviderError> {
        let mut writes = Writes::default();

        if plan.ptr == Change::Created {
            writes.creates.push(self.attributes(&desired.ptr)?);
        }
        if plan.srv != Change::None {
            self.replace(&mut writes, &current.srv, std::slice::from_ref(&desired.srv))?;
        }
        if plan.txt != Change::None {
            self.replace(&mut writes, &current.txt, &desired.txt)?;
        }

        Ok(writes)
    }

    /// Leave records that already match alone, turn the remaining existing
    /// records into updates of the remaining desired ones, and delete or
    /// create whatever is left over.
    fn replace(
        &self,
        writes: &mut Writes,
        existing: &[ZoneRecord],
        desired: &[Record],
    ) -> Result<(), ProviderError> {
        let models: Vec<Record> = existing.iter().map(|r| self.to_record(r)).collect();
        let pairing = pair_records(&models, desired);

        let mut stale = pairing.stale.iter().map(|&index| &existing[index]);
        for &index in &pairing.missing {
            let attributes = self.attributes(&desired[index])?;
            match stale.next() {
                Some(current) => writes.updates.push((current.clone(), attributes)),
                None => writes.creates.push(attributes),
            }
        }
        writes.deletes.extend(stale.cloned());
        Ok(())
    }

    async fn apply(&self, writes: Writes) -> Result<(), ProviderError> {
        let zone = self.zone.name.as_str();

        for record in &writes.deletes {
            debug!(
                zone = %zone,
                record_id = record.id,
                record_type = %record.record_type,
                "Deleting DNSimple record"
            );
            self.api
                .delete_record(zone, record.id)
                .await
                .map_err(ProviderError::api("delete", type_label(&record.record_type), zone))?;
        }

        for (before, after) in &writes.updates {
            debug!(
                zone = %zone,
                record_id = before.id,
                record_type = %before.record_type,
                "Updating DNSimple record"
            );
            self.api
                .update_record(zone, before.id, after)
                .await
                .map_err(ProviderError::api("update", type_label(&before.record_type), zone))?;
        }

        for attributes in &writes.creates {
            debug!(
                zone = %zone,
                name = %attributes.name,
                record_type = %attributes.record_type,
                "Creating DNSimple record"
            );
            self.api
                .create_record(zone, attributes)
                .await
                .map_err(ProviderError::api("create", type_label(&attributes.record_type), zone))?;
        }

        Ok(())
    }
}

#[async_trait]
impl Advertiser for DnsimpleAdvertiser {
    fn id(&self) -> &str {
        &self.id
    }

    fn zone_name(&self) -> &str {
        &self.zone.name
    }

    async fn advertise(&self, instance: &ServiceInstance) -> Result<ChangeSet, ProviderError> {
        instance.validate()?;

        let desired = desired_records(instance);
        let current = self.current_records(instance).await?;
        let plan = plan_advertise(&self.existing(&current), &desired);

        let writes = self.advertise_writes(&current, &desired, &plan)?;
        if writes.is_empty() {
            return Ok(plan);
        }

        info!(
            zone = %self.zone.name,
            instance = %desired.srv.name,
            changes = %plan,
            "Advertising instance in DNSimple"
        );
        self.apply(writes).await?;
        Ok(plan)
    }

    async fn unadvertise(&self, instance: &ServiceInstance) -> Result<ChangeSet, ProviderError> {
        let instance_name = instance.instance_name();
        let current = self.current_records(instance).await?;
        let plan = plan_unadvertise(&self.existing(&current), &instance_name);

        let mut writes = Writes::default();
        if plan.ptr == Change::Deleted {
            writes.deletes.extend(
                current
                    .ptr
                    .iter()
                    .filter(|r| names_equal(&r.content, &instance_name))
                    .cloned(),
            );
        }
        if plan.srv == Change::Deleted {
            writes.deletes.extend(current.srv.iter().cloned());
        }
        if plan.txt == Change::Deleted {
            writes.deletes.extend(current.txt.iter().cloned());
        }

        if writes.is_empty() {
            return Ok(plan);
        }

        info!(
            zone = %self.zone.name,
            instance = %instance_name,
            changes = %plan,
            "Unadvertising instance from DNSimple"
        );
        self.apply(writes).await?;
        Ok(plan)
    }
}

fn type_label(record_type: &str) -> &'static str {
    match record_type {
        "PTR" => RecordType::PTR.as_str(),
        "SRV" => RecordType::SRV.as_str(),
        "TXT" => RecordType::TXT.as_str(),
        _ => "record",
    }
}

#[cfg(test)]
#[path = "advertiser_tests.rs"]
mod advertiser_tests;
