// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Write-back of reconciliation results to the API server.
//!
//! The engine never talks to Kubernetes directly; it goes through an
//! [`InstanceStore`], which keeps it testable without a cluster.

use anyhow::{Context, Result};
use async_trait::async_trait;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use serde_json::{json, Value};
use tracing::debug;

use super::finalizers;
use super::retry::retry_api_call;
use crate::constants::{FIELD_MANAGER, UNADVERTISE_FINALIZER};
use crate::crd::{DNSSDServiceInstance, DNSSDServiceInstanceStatus};

/// Status subresource and deletion guard of `DNSSDServiceInstance` objects.
#[async_trait]
pub trait InstanceStore: Send + Sync {
    /// Overwrite the status subresource in full.
    async fn write_status(
        &self,
        instance: &DNSSDServiceInstance,
        status: &DNSSDServiceInstanceStatus,
    ) -> Result<()>;

    /// Add the unadvertise finalizer if missing.
    async fn add_finalizer(&self, instance: &DNSSDServiceInstance) -> Result<()>;

    /// Remove the unadvertise finalizer, permitting deletion.
    async fn remove_finalizer(&self, instance: &DNSSDServiceInstance) -> Result<()>;
}

/// Merge patch that replaces every status field.
///
/// Unset fields are sent as explicit nulls or empty values so that a merge
/// patch clears what an earlier state wrote.
#[must_use]
pub fn status_patch(status: &DNSSDServiceInstanceStatus) -> Value {
    json!({
        "status": {
            "providerId": status.provider_id,
            "providerDescription": status.provider_description,
            "advertiserId": status.advertiser_id,
            "status": status.status,
            "message": status.message,
            "observedGeneration": status.observed_generation,
            "conditions": status.conditions,
        }
    })
}

/// [`InstanceStore`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeInstanceStore {
    client: Client,
}

impl KubeInstanceStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl InstanceStore for KubeInstanceStore {
    async fn write_status(
        &self,
        instance: &DNSSDServiceInstance,
        status: &DNSSDServiceInstanceStatus,
    ) -> Result<()> {
        let namespace = instance.namespace().unwrap_or_default();
        let name = instance.name_any();
        let api: Api<DNSSDServiceInstance> = Api::namespaced(self.client.clone(), &namespace);
        let patch = status_patch(status);

        let patch_params = PatchParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..PatchParams::default()
        };

        retry_api_call(
            || async {
                api.patch_status(&name, &patch_params, &Patch::Merge(&patch))
                    .await
                    .map(|_| ())
            },
            &format!("patch status of {namespace}/{name}"),
        )
        .await
        .with_context(|| format!("Failed to update status of DNSSDServiceInstance {namespace}/{name}"))?;

        debug!(
            namespace = %namespace,
            name = %name,
            status = ?status.status,
            "Updated DNSSDServiceInstance status"
        );
        Ok(())
    }

    async fn add_finalizer(&self, instance: &DNSSDServiceInstance) -> Result<()> {
        finalizers::ensure_finalizer(&self.client, instance, UNADVERTISE_FINALIZER).await
    }

    async fn remove_finalizer(&self, instance: &DNSSDServiceInstance) -> Result<()> {
        finalizers::remove_finalizer(&self.client, instance, UNADVERTISE_FINALIZER).await
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod store_tests;
