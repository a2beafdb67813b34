// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `DNSSDServiceInstance` reconciliation.
//!
//! One call to [`DnssdReconciler::reconcile`] moves a resource one step through
//! its lifecycle:
//!
//! - **Advertise path** (no deletion timestamp): resolve the first provider
//!   hosting the instance's domain, add the unadvertise finalizer, write the
//!   records, record the provider and zone in status.
//! - **Unadvertise path** (deletion timestamp set): locate the zone recorded in
//!   status, remove the records, then remove the finalizer.
//!
//! The DNS mutation and each status write run under separate deadlines, so a
//! slow status write never cancels a finished DNS change. Retry timing belongs
//! to the controller; a reconciliation keeps no state between calls.

use anyhow::{anyhow, Context, Result};
use kube::ResourceExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::finalizers::has_finalizer;
use super::status::{self, status_changed, AdvertiserRef};
use super::store::InstanceStore;
use crate::constants::{
    ADVERTISE_TIMEOUT_SECS, KIND_DNSSD_SERVICE_INSTANCE, STATUS_WRITE_TIMEOUT_SECS,
    UNADVERTISE_FINALIZER,
};
use crate::crd::{AdvertisementStatus, DNSSDServiceInstance, DNSSDServiceInstanceStatus};
use crate::dnssd::ServiceInstance;
use crate::metrics;
use crate::provider::{
    AdvertiseResult, Advertiser, ProviderError, ProviderRegistry, Resolved, UnadvertiseResult,
};

/// Deadlines applied within one reconciliation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeouts {
    /// Bound on one advertise or unadvertise call, including propagation waits
    pub advertise: Duration,
    /// Bound on one status write
    pub status_write: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            advertise: Duration::from_secs(ADVERTISE_TIMEOUT_SECS),
            status_write: Duration::from_secs(STATUS_WRITE_TIMEOUT_SECS),
        }
    }
}

/// Where a successful reconciliation left the resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No configured provider hosts the domain; nothing was written.
    Pending,
    /// The records match the spec.
    Advertised(AdvertiseResult),
    /// The spec is invalid; nothing was written and retrying cannot help until
    /// it is edited.
    Rejected,
    /// The records were removed and the finalizer released.
    Unadvertised,
    /// Deletion needed no DNS work.
    RemovalPermitted,
}

/// The reconciliation engine.
pub struct DnssdReconciler {
    registry: ProviderRegistry,
    store: Arc<dyn InstanceStore>,
    timeouts: Timeouts,
}

impl DnssdReconciler {
    #[must_use]
    pub fn new(registry: ProviderRegistry, store: Arc<dyn InstanceStore>, timeouts: Timeouts) -> Self {
        Self {
            registry,
            store,
            timeouts,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Reconcile one resource.
    ///
    /// # Errors
    ///
    /// Returns an error if a provider call fails, a deadline passes, or a
    /// status or finalizer write fails. The controller requeues with backoff.
    pub async fn reconcile(&self, resource: &DNSSDServiceInstance) -> Result<ReconcileOutcome> {
        if resource.metadata.deletion_timestamp.is_some() {
            self.unadvertise(resource).await
        } else {
            self.advertise(resource).await
        }
    }

    async fn advertise(&self, resource: &DNSSDServiceInstance) -> Result<ReconcileOutcome> {
        let namespace = resource.namespace().unwrap_or_default();
        let name = resource.name_any();
        let generation = resource.metadata.generation;
        let mut current = resource.status.clone();

        info!("Reconciling DNSSDServiceInstance: {}/{}", namespace, name);

        let instance = match ServiceInstance::try_from(&resource.spec) {
            Ok(instance) => instance,
            Err(e) => {
                let err = ProviderError::InvalidInstance(e);
                warn!(
                    namespace = %namespace,
                    name = %name,
                    error = %err,
                    "Rejecting DNSSDServiceInstance"
                );
                metrics::record_error(KIND_DNSSD_SERVICE_INSTANCE, err.status_reason());
                let new = status::advertise_error(None, &err, generation, current.as_ref());
                self.write_status(resource, &mut current, new).await?;
                return Ok(ReconcileOutcome::Rejected);
            }
        };

        let resolved = match self.registry.resolve_domain(&instance.domain).await {
            Ok(resolved) => resolved,
            Err(e) => {
                return Err(self
                    .advertise_failed(resource, None, e, &mut current)
                    .await
                    .context(format!("Failed to resolve a provider for '{}'", instance.domain)));
            }
        };

        let Some(Resolved {
            provider,
            advertiser,
        }) = resolved
        else {
            info!(
                "No configured provider hosts a zone for {} ({}/{}); leaving Pending",
                instance.domain, namespace, name
            );
            let new = status::pending(&instance.domain, generation, current.as_ref());
            self.write_status(resource, &mut current, new).await?;
            return Ok(ReconcileOutcome::Pending);
        };

        let target = AdvertiserRef::new(provider.as_ref(), advertiser.as_ref());
        debug!(
            provider = %target.provider_id,
            zone = %advertiser.zone_name(),
            instance = %instance.instance_name(),
            "Selected advertiser"
        );

        if !has_finalizer(resource, UNADVERTISE_FINALIZER) {
            self.store
                .add_finalizer(resource)
                .await
                .with_context(|| format!("Failed to add finalizer to {namespace}/{name}"))?;
        }

        // Periodic resyncs of an advertised instance skip the transient state
        let steady = current.as_ref().is_some_and(|s| {
            s.status == Some(AdvertisementStatus::Advertised) && s.observed_generation == generation
        }) && AdvertiserRef::recorded(current.as_ref()).as_ref() == Some(&target);
        if !steady {
            let new = status::advertising(&target, generation, current.as_ref());
            self.write_status(resource, &mut current, new).await?;
        }

        let started = Instant::now();
        let result = self
            .bounded("advertise", advertiser.as_ref(), advertiser.advertise(&instance))
            .await;
        metrics::record_provider_operation(provider.id(), "advertise", started.elapsed());

        let changes = match result {
            Ok(changes) => changes,
            Err(e) => {
                return Err(self
                    .advertise_failed(resource, Some(&target), e, &mut current)
                    .await
                    .context(format!(
                        "Failed to advertise {namespace}/{name} in zone {}",
                        advertiser.zone_name()
                    )));
            }
        };

        metrics::record_dns_changes(provider.id(), &changes);
        let outcome = AdvertiseResult::from_change_set(&changes);
        if changes.is_empty() {
            debug!("{}/{}: {}", namespace, name, outcome);
        } else {
            info!(
                namespace = %namespace,
                name = %name,
                zone = %advertiser.zone_name(),
                changes = %changes,
                "{}", outcome
            );
        }

        // The records are written; a failed write here is retried on its own
        let new = status::advertised(&target, outcome, generation, current.as_ref());
        self.write_status(resource, &mut current, new).await?;

        Ok(ReconcileOutcome::Advertised(outcome))
    }

    /// Record an advertise failure in status and return it as an error.
    async fn advertise_failed(
        &self,
        resource: &DNSSDServiceInstance,
        target: Option<&AdvertiserRef>,
        error: ProviderError,
        current: &mut Option<DNSSDServiceInstanceStatus>,
    ) -> anyhow::Error {
        metrics::record_error(KIND_DNSSD_SERVICE_INSTANCE, error.status_reason());
        let new = status::advertise_error(
            target,
            &error,
            resource.metadata.generation,
            current.as_ref(),
        );
        if let Err(e) = self.write_status(resource, current, new).await {
            warn!(
                "Failed to record advertise error for {}/{}: {:#}",
                resource.namespace().unwrap_or_default(),
                resource.name_any(),
                e
            );
        }
        anyhow::Error::new(error)
    }

    async fn unadvertise(&self, resource: &DNSSDServiceInstance) -> Result<ReconcileOutcome> {
        let namespace = resource.namespace().unwrap_or_default();
        let name = resource.name_any();

        if !has_finalizer(resource, UNADVERTISE_FINALIZER) {
            debug!("{}/{} has no unadvertise finalizer; nothing to do", namespace, name);
            return Ok(ReconcileOutcome::RemovalPermitted);
        }

        info!("Deleting DNSSDServiceInstance: {}/{}", namespace, name);
        let mut current = resource.status.clone();

        let pending = current
            .as_ref()
            .is_some_and(|s| s.status == Some(AdvertisementStatus::Pending));
        let Some(target) = AdvertiserRef::recorded(current.as_ref()).filter(|_| !pending) else {
            info!(
                "{}/{} was never advertised; removing finalizer",
                namespace, name
            );
            self.release(resource).await?;
            return Ok(ReconcileOutcome::RemovalPermitted);
        };

        let instance = match ServiceInstance::try_from(&resource.spec) {
            Ok(instance) => instance,
            Err(e) => {
                warn!(
                    namespace = %namespace,
                    name = %name,
                    zone = %target.advertiser_id,
                    error = %e,
                    "Spec no longer names valid records; releasing without removing them"
                );
                let message = format!("records not removed: invalid service instance: {e}");
                let new = status::unadvertised(&target, &message, current.as_ref());
                self.write_status(resource, &mut current, new).await?;
                self.release(resource).await?;
                return Ok(ReconcileOutcome::Unadvertised);
            }
        };

        let advertiser = match self.recorded_advertiser(&target).await {
            Ok(advertiser) => advertiser,
            Err(e) => {
                return Err(self
                    .unadvertise_failed(resource, &target, e, &mut current)
                    .await
                    .context(format!(
                        "Failed to locate zone {} of provider {}",
                        target.advertiser_id, target.provider_id
                    )));
            }
        };

        let new = status::unadvertising(&target, current.as_ref());
        self.write_status(resource, &mut current, new).await?;

        let started = Instant::now();
        let result = self
            .bounded("unadvertise", advertiser.as_ref(), advertiser.unadvertise(&instance))
            .await;
        metrics::record_provider_operation(&target.provider_id, "unadvertise", started.elapsed());

        let changes = match result {
            Ok(changes) => changes,
            Err(e) => {
                return Err(self
                    .unadvertise_failed(resource, &target, e, &mut current)
                    .await
                    .context(format!(
                        "Failed to unadvertise {namespace}/{name} from zone {}",
                        advertiser.zone_name()
                    )));
            }
        };

        metrics::record_dns_changes(&target.provider_id, &changes);
        let message = match UnadvertiseResult::from_change_set(&changes) {
            UnadvertiseResult::UnadvertisedExistingInstance => format!(
                "removed records from {} zone {}",
                target.provider_description, target.advertiser_id
            ),
            UnadvertiseResult::InstanceNotAdvertised => format!(
                "no records present in {} zone {}",
                target.provider_description, target.advertiser_id
            ),
        };
        info!(
            namespace = %namespace,
            name = %name,
            changes = %changes,
            "{}", message
        );

        let new = status::unadvertised(&target, &message, current.as_ref());
        self.write_status(resource, &mut current, new).await?;
        self.release(resource).await?;

        Ok(ReconcileOutcome::Unadvertised)
    }

    async fn unadvertise_failed(
        &self,
        resource: &DNSSDServiceInstance,
        target: &AdvertiserRef,
        error: ProviderError,
        current: &mut Option<DNSSDServiceInstanceStatus>,
    ) -> anyhow::Error {
        metrics::record_error(KIND_DNSSD_SERVICE_INSTANCE, error.status_reason());
        let new = status::unadvertise_error(target, &error, current.as_ref());
        if let Err(e) = self.write_status(resource, current, new).await {
            warn!(
                "Failed to record unadvertise error for {}/{}: {:#}",
                resource.namespace().unwrap_or_default(),
                resource.name_any(),
                e
            );
        }
        anyhow::Error::new(error)
    }

    /// Advertiser for the zone recorded in status, never re-resolved by domain.
    async fn recorded_advertiser(
        &self,
        target: &AdvertiserRef,
    ) -> Result<Box<dyn Advertiser>, ProviderError> {
        let provider = self
            .registry
            .get(&target.provider_id)
            .ok_or_else(|| ProviderError::UnknownProvider(target.provider_id.clone()))?;
        provider.advertiser_by_id(&target.advertiser_id).await
    }

    /// Run a provider call under the advertise deadline.
    async fn bounded<T>(
        &self,
        operation: &'static str,
        advertiser: &dyn Advertiser,
        call: impl std::future::Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, ProviderError> {
        tokio::time::timeout(self.timeouts.advertise, call)
            .await
            .unwrap_or_else(|_| {
                Err(ProviderError::Timeout {
                    operation,
                    zone: advertiser.zone_name().to_string(),
                    after: self.timeouts.advertise,
                })
            })
    }

    /// Write `new` unless it matches what is already stored.
    async fn write_status(
        &self,
        resource: &DNSSDServiceInstance,
        current: &mut Option<DNSSDServiceInstanceStatus>,
        new: DNSSDServiceInstanceStatus,
    ) -> Result<()> {
        if !status_changed(current.as_ref(), &new) {
            return Ok(());
        }

        tokio::time::timeout(
            self.timeouts.status_write,
            self.store.write_status(resource, &new),
        )
        .await
        .map_err(|_| {
            anyhow!(
                "Status write for {}/{} timed out after {:?}",
                resource.namespace().unwrap_or_default(),
                resource.name_any(),
                self.timeouts.status_write
            )
        })??;

        *current = Some(new);
        Ok(())
    }

    async fn release(&self, resource: &DNSSDServiceInstance) -> Result<()> {
        self.store.remove_finalizer(resource).await.with_context(|| {
            format!(
                "Failed to remove finalizer from {}/{}",
                resource.namespace().unwrap_or_default(),
                resource.name_any()
            )
        })
    }
}

#[cfg(test)]
#[path = "dnssdserviceinstance_tests.rs"]
mod dnssdserviceinstance_tests;
