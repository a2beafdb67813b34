// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Google Cloud DNS provider.
//!
//! Records are written through atomic changes. Cloud DNS applies a change
//! asynchronously, so every advertise or unadvertise that writes anything
//! waits for the change to report `done` before returning.
//!
//! # Identifiers
//!
//! - Provider ID: `clouddns/<project>`
//! - Advertiser ID: the managed zone's numeric id

pub mod advertiser;
pub mod client;

#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::dnssd::{domain_ancestors, fqdn, names_equal};
use crate::provider::{Advertiser, Provider, ProviderError};
use crate::reconcilers::retry::{propagation_backoff, BackoffPolicy};

pub use advertiser::CloudDnsAdvertiser;
pub use client::{CloudDnsApi, CloudDnsClient};

/// Cloud DNS zones of one Google Cloud project.
pub struct CloudDnsProvider {
    id: String,
    api: Arc<dyn CloudDnsApi>,
    propagation: BackoffPolicy,
}

impl CloudDnsProvider {
    #[must_use]
    pub fn new(project: &str, api: Arc<dyn CloudDnsApi>) -> Self {
        Self {
            id: format!("clouddns/{project}"),
            api,
            propagation: propagation_backoff(),
        }
    }

    /// Replace the propagation polling schedule
    #[must_use]
    pub fn with_propagation_backoff(mut self, propagation: BackoffPolicy) -> Self {
        self.propagation = propagation;
        self
    }
}

#[async_trait]
impl Provider for CloudDnsProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn describe(&self) -> &str {
        "Google Cloud DNS"
    }

    async fn advertiser_by_domain(
        &self,
        domain: &str,
    ) -> Result<Option<Box<dyn Advertiser>>, ProviderError> {
        for candidate in domain_ancestors(domain)? {
            let zones = self
                .api
                .find_zones(&fqdn(&candidate))
                .await
                .map_err(ProviderError::api("find", "zone", &candidate))?;

            let zone = zones
                .into_iter()
                .find(|z| !z.is_private() && names_equal(&z.dns_name, &candidate));

            if let Some(zone) = zone {
                debug!(
                    provider = %self.id,
                    domain = %domain,
                    zone = %zone.dns_name,
                    zone_id = %zone.id,
                    "Resolved domain to Cloud DNS zone"
                );
                return Ok(Some(Box::new(CloudDnsAdvertiser::new(
                    Arc::clone(&self.api),
                    zone,
                    self.propagation,
                ))));
            }
        }

        Ok(None)
    }

    async fn advertiser_by_id(&self, id: &str) -> Result<Box<dyn Advertiser>, ProviderError> {
        let zone = self
            .api
            .get_zone(id)
            .await
            .map_err(ProviderError::api("get", "zone", id))?
            .ok_or_else(|| ProviderError::ZoneNotFound {
                provider: self.id.clone(),
                zone: id.to_string(),
            })?;

        Ok(Box::new(CloudDnsAdvertiser::new(
            Arc::clone(&self.api),
            zone,
            self.propagation,
        )))
    }
}
