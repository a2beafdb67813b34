// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status builders for `DNSSDServiceInstance` resources.
//!
//! Every reconciliation step overwrites the status subresource in full. The
//! functions here compute that full status for each lifecycle state; none of
//! them talk to the API server.
//!
//! # Condition Format
//!
//! A single `Ready` condition mirrors the advertisement state:
//! - `status`: "True" only while `Advertised`, "Unknown" while a DNS change is
//!   in flight, "False" otherwise
//! - `reason`: one of the constants in [`crate::status_reasons`]
//! - `lastTransitionTime`: preserved while `status` does not change

use chrono::Utc;

use crate::crd::{AdvertisementStatus, Condition, DNSSDServiceInstanceStatus};
use crate::provider::{AdvertiseResult, Advertiser, Provider, ProviderError};
use crate::status_reasons::{
    CONDITION_TYPE_READY, REASON_ADVERTISING, REASON_INSTANCE_UNCHANGED, REASON_INSTANCE_UPDATED,
    REASON_NEW_INSTANCE_ADVERTISED, REASON_NO_PROVIDER_FOR_DOMAIN, REASON_UNADVERTISED,
    REASON_UNADVERTISING,
};

/// Identity of the provider and zone an instance is (or was) advertised in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdvertiserRef {
    pub provider_id: String,
    pub provider_description: String,
    pub advertiser_id: String,
}

impl AdvertiserRef {
    #[must_use]
    pub fn new(provider: &dyn Provider, advertiser: &dyn Advertiser) -> Self {
        Self {
            provider_id: provider.id().to_string(),
            provider_description: provider.describe().to_string(),
            advertiser_id: advertiser.id().to_string(),
        }
    }

    /// Identity recorded in `status`, if the instance was ever handed to an
    /// advertiser.
    #[must_use]
    pub fn recorded(status: Option<&DNSSDServiceInstanceStatus>) -> Option<Self> {
        let status = status?;
        if status.provider_id.is_empty() || status.advertiser_id.is_empty() {
            return None;
        }
        Some(Self {
            provider_id: status.provider_id.clone(),
            provider_description: status.provider_description.clone(),
            advertiser_id: status.advertiser_id.clone(),
        })
    }
}

/// Create a new Kubernetes condition with the current timestamp.
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// Find a condition by type in a list of conditions.
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Update or add a condition in place.
///
/// `lastTransitionTime` is kept when the condition's status is unchanged.
pub fn update_condition_in_memory(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition_type) {
        let last_transition_time = if existing.status == status {
            existing
                .last_transition_time
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339())
        } else {
            Utc::now().to_rfc3339()
        };

        existing.status = status.to_string();
        existing.reason = Some(reason.to_string());
        existing.message = Some(message.to_string());
        existing.last_transition_time = Some(last_transition_time);
    } else {
        conditions.push(create_condition(condition_type, status, reason, message));
    }
}

/// Compare two condition lists ignoring `lastTransitionTime`.
#[must_use]
pub fn conditions_equal(current: &[Condition], new: &[Condition]) -> bool {
    current.len() == new.len()
        && new.iter().all(|new_cond| {
            find_condition(current, &new_cond.r#type).is_some_and(|curr| {
                curr.status == new_cond.status
                    && curr.reason == new_cond.reason
                    && curr.message == new_cond.message
            })
        })
}

/// Whether writing `new` would change anything a reader can observe.
///
/// Timestamps alone never count as a change, so status-only watch events do
/// not cause write loops.
#[must_use]
pub fn status_changed(
    current: Option<&DNSSDServiceInstanceStatus>,
    new: &DNSSDServiceInstanceStatus,
) -> bool {
    let Some(current) = current else {
        return true;
    };

    current.provider_id != new.provider_id
        || current.provider_description != new.provider_description
        || current.advertiser_id != new.advertiser_id
        || current.status != new.status
        || current.message != new.message
        || current.observed_generation != new.observed_generation
        || !conditions_equal(&current.conditions, &new.conditions)
}

fn build(
    target: AdvertiserRef,
    state: AdvertisementStatus,
    observed_generation: Option<i64>,
    ready: (&str, &str),
    message: String,
    current: Option<&DNSSDServiceInstanceStatus>,
) -> DNSSDServiceInstanceStatus {
    let (ready_status, reason) = ready;
    let mut conditions = current.map(|c| c.conditions.clone()).unwrap_or_default();
    update_condition_in_memory(
        &mut conditions,
        CONDITION_TYPE_READY,
        ready_status,
        reason,
        &message,
    );

    DNSSDServiceInstanceStatus {
        provider_id: target.provider_id,
        provider_description: target.provider_description,
        advertiser_id: target.advertiser_id,
        status: Some(state),
        message: Some(message),
        observed_generation,
        conditions,
    }
}

/// No configured provider hosts a zone covering `domain`.
#[must_use]
pub fn pending(
    domain: &str,
    generation: Option<i64>,
    current: Option<&DNSSDServiceInstanceStatus>,
) -> DNSSDServiceInstanceStatus {
    build(
        AdvertiserRef::default(),
        AdvertisementStatus::Pending,
        generation,
        ("False", REASON_NO_PROVIDER_FOR_DOMAIN),
        format!("no configured provider hosts a zone for '{domain}'"),
        current,
    )
}

/// A provider was selected and the DNS change is about to be made.
#[must_use]
pub fn advertising(
    target: &AdvertiserRef,
    generation: Option<i64>,
    current: Option<&DNSSDServiceInstanceStatus>,
) -> DNSSDServiceInstanceStatus {
    build(
        target.clone(),
        AdvertisementStatus::Advertising,
        generation,
        ("Unknown", REASON_ADVERTISING),
        format!(
            "advertising in {} zone {}",
            target.provider_description, target.advertiser_id
        ),
        current,
    )
}

/// The DNS records match the instance.
#[must_use]
pub fn advertised(
    target: &AdvertiserRef,
    result: AdvertiseResult,
    generation: Option<i64>,
    current: Option<&DNSSDServiceInstanceStatus>,
) -> DNSSDServiceInstanceStatus {
    let reason = match result {
        AdvertiseResult::AdvertisedNewInstance => REASON_NEW_INSTANCE_ADVERTISED,
        AdvertiseResult::UpdatedExistingInstance => REASON_INSTANCE_UPDATED,
        AdvertiseResult::InstanceAlreadyAdvertised => REASON_INSTANCE_UNCHANGED,
    };

    build(
        target.clone(),
        AdvertisementStatus::Advertised,
        generation,
        ("True", reason),
        format!(
            "{result} in {} zone {}",
            target.provider_description, target.advertiser_id
        ),
        current,
    )
}

/// Advertising failed.
///
/// `target` is `None` when the instance was rejected before a provider was
/// selected; the identity already recorded in `current` is kept so a later
/// deletion still finds the zone.
#[must_use]
pub fn advertise_error(
    target: Option<&AdvertiserRef>,
    error: &ProviderError,
    generation: Option<i64>,
    current: Option<&DNSSDServiceInstanceStatus>,
) -> DNSSDServiceInstanceStatus {
    let target = target
        .cloned()
        .or_else(|| AdvertiserRef::recorded(current))
        .unwrap_or_default();

    build(
        target,
        AdvertisementStatus::AdvertiseError,
        generation,
        ("False", error.status_reason()),
        error.to_string(),
        current,
    )
}

/// Deletion requested; the records are about to be removed.
#[must_use]
pub fn unadvertising(
    target: &AdvertiserRef,
    current: Option<&DNSSDServiceInstanceStatus>,
) -> DNSSDServiceInstanceStatus {
    build(
        target.clone(),
        AdvertisementStatus::Unadvertising,
        current.and_then(|c| c.observed_generation),
        ("False", REASON_UNADVERTISING),
        format!(
            "removing records from {} zone {}",
            target.provider_description, target.advertiser_id
        ),
        current,
    )
}

/// The records are gone and the resource may be deleted.
#[must_use]
pub fn unadvertised(
    target: &AdvertiserRef,
    message: &str,
    current: Option<&DNSSDServiceInstanceStatus>,
) -> DNSSDServiceInstanceStatus {
    build(
        target.clone(),
        AdvertisementStatus::Unadvertised,
        current.and_then(|c| c.observed_generation),
        ("False", REASON_UNADVERTISED),
        message.to_string(),
        current,
    )
}

/// Removing the records failed; deletion stays blocked.
#[must_use]
pub fn unadvertise_error(
    target: &AdvertiserRef,
    error: &ProviderError,
    current: Option<&DNSSDServiceInstanceStatus>,
) -> DNSSDServiceInstanceStatus {
    build(
        target.clone(),
        AdvertisementStatus::UnadvertiseError,
        current.and_then(|c| c.observed_generation),
        ("False", error.status_reason()),
        error.to_string(),
        current,
    )
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
