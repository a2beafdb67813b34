// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNSimple provider.
//!
//! # Identifiers
//!
//! - Provider ID: `dnsimple/<account>`
//! - Advertiser ID: `<account>/<zone name>`

pub mod advertiser;
pub mod client;

#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::dnssd::{domain_ancestors, names_equal};
use crate::provider::{Advertiser, Provider, ProviderError};

pub use advertiser::DnsimpleAdvertiser;
pub use client::{DnsimpleApi, DnsimpleClient};

/// Zones hosted by one DNSimple account.
pub struct DnsimpleProvider {
    id: String,
    account: String,
    api: Arc<dyn DnsimpleApi>,
}

impl DnsimpleProvider {
    #[must_use]
    pub fn new(account: &str, api: Arc<dyn DnsimpleApi>) -> Self {
        Self {
            id: format!("dnsimple/{account}"),
            account: account.to_string(),
            api,
        }
    }
}

#[async_trait]
impl Provider for DnsimpleProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn describe(&self) -> &str {
        "DNSimple"
    }

    async fn advertiser_by_domain(
        &self,
        domain: &str,
    ) -> Result<Option<Box<dyn Advertiser>>, ProviderError> {
        for candidate in domain_ancestors(domain)? {
            let zone = self
                .api
                .get_zone(&candidate)
                .await
                .map_err(ProviderError::api("find", "zone", &candidate))?;

            if let Some(zone) = zone.filter(|z| names_equal(&z.name, &candidate)) {
                debug!(
                    provider = %self.id,
                    domain = %domain,
                    zone = %zone.name,
                    zone_id = zone.id,
                    "Resolved domain to DNSimple zone"
                );
                return Ok(Some(Box::new(DnsimpleAdvertiser::new(
                    Arc::clone(&self.api),
                    zone,
                ))));
            }
        }

        Ok(None)
    }

    async fn advertiser_by_id(&self, id: &str) -> Result<Box<dyn Advertiser>, ProviderError> {
        let (account, zone_name) = id
            .split_once('/')
            .filter(|(account, zone)| !account.is_empty() && !zone.is_empty())
            .ok_or_else(|| ProviderError::InvalidAdvertiserId(id.to_string()))?;

        if account != self.account {
            return Err(ProviderError::InvalidAdvertiserId(id.to_string()));
        }

        let zone = self
            .api
            .get_zone(zone_name)
            .await
            .map_err(ProviderError::api("get", "zone", zone_name))?
            .ok_or_else(|| ProviderError::ZoneNotFound {
                provider: self.id.clone(),
                zone: zone_name.to_string(),
            })?;

        Ok(Box::new(DnsimpleAdvertiser::new(Arc::clone(&self.api), zone)))
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
