// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Finalizer management for namespaced resources.
//!
//! The unadvertise finalizer is added before any DNS record is written and
//! removed only after the records are gone, so the API server cannot erase a
//! resource whose records still exist.
//!
//! Both operations are idempotent: they compute the desired finalizer list and
//! send a JSON merge patch only when it differs from the current one.
//!
//! # Example
//!
//! ```rust,no_run
//! use dnssd_operator::constants::UNADVERTISE_FINALIZER;
//! use dnssd_operator::crd::DNSSDServiceInstance;
//! use dnssd_operator::reconcilers::finalizers::ensure_finalizer;
//! use kube::Client;
//!
//! async fn guard(client: Client, instance: DNSSDServiceInstance) -> anyhow::Result<()> {
//!     ensure_finalizer(&client, &instance, UNADVERTISE_FINALIZER).await
//! }
//! ```

use anyhow::{Context, Result};
use kube::api::{Patch, PatchParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde_json::{json, Value};
use tracing::info;

use super::retry::retry_api_call;
use crate::constants::FIELD_MANAGER;

/// Whether `finalizer` is present on `resource`
#[must_use]
pub fn has_finalizer<T: Resource>(resource: &T, finalizer: &str) -> bool {
    resource
        .meta()
        .finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|x| x == finalizer))
}

/// Finalizer list with `finalizer` appended, or `None` if already present.
#[must_use]
pub fn with_finalizer(current: Option<&[String]>, finalizer: &str) -> Option<Vec<String>> {
    let current = current.unwrap_or_default();
    if current.iter().any(|f| f == finalizer) {
        return None;
    }
    let mut finalizers = current.to_vec();
    finalizers.push(finalizer.to_string());
    Some(finalizers)
}

/// Finalizer list without `finalizer`, or `None` if it was absent.
#[must_use]
pub fn without_finalizer(current: Option<&[String]>, finalizer: &str) -> Option<Vec<String>> {
    let current = current.unwrap_or_default();
    if !current.iter().any(|f| f == finalizer) {
        return None;
    }
    Some(
        current
            .iter()
            .filter(|f| *f != finalizer)
            .cloned()
            .collect(),
    )
}

/// Merge patch replacing the finalizer list.
#[must_use]
pub fn finalizers_patch(finalizers: &[String]) -> Value {
    json!({ "metadata": { "finalizers": finalizers } })
}

async fn patch_finalizers<T>(client: &Client, resource: &T, finalizers: &[String]) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + std::fmt::Debug
        + serde::de::DeserializeOwned,
{
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    let api: Api<T> = Api::namespaced(client.clone(), &namespace);
    let patch = finalizers_patch(finalizers);

    let patch_params = PatchParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..PatchParams::default()
    };

    retry_api_call(
        || async {
            api.patch(&name, &patch_params, &Patch::Merge(&patch))
                .await
                .map(|_| ())
        },
        &format!("patch finalizers of {namespace}/{name}"),
    )
    .await
    .with_context(|| format!("Failed to patch finalizers of {}/{namespace}/{name}", T::kind(&())))
}

/// Add a finalizer to a resource if not already present.
///
/// # Errors
///
/// Returns an error if the patch fails after retries.
pub async fn ensure_finalizer<T>(client: &Client, resource: &T, finalizer: &str) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + std::fmt::Debug
        + serde::de::DeserializeOwned,
{
    let Some(finalizers) = with_finalizer(resource.meta().finalizers.as_deref(), finalizer) else {
        return Ok(());
    };

    info!(
        "Adding finalizer {} to {}/{} {}",
        finalizer,
        resource.namespace().unwrap_or_default(),
        resource.name_any(),
        T::kind(&())
    );
    patch_finalizers(client, resource, &finalizers).await
}

/// Remove a finalizer from a resource if present.
///
/// # Errors
///
/// Returns an error if the patch fails after retries.
pub async fn remove_finalizer<T>(client: &Client, resource: &T, finalizer: &str) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + std::fmt::Debug
        + serde::de::DeserializeOwned,
{
    let Some(finalizers) = without_finalizer(resource.meta().finalizers.as_deref(), finalizer)
    else {
        return Ok(());
    };

    info!(
        "Removing finalizer {} from {}/{} {}",
        finalizer,
        resource.namespace().unwrap_or_default(),
        resource.name_any(),
        T::kind(&())
    );
    patch_finalizers(client, resource, &finalizers).await
}

#[cfg(test)]
#[path = "finalizers_tests.rs"]
mod finalizers_tests;
