// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS providers and advertisers.
//!
//! A [`Provider`] is one configured DNS backend (a Cloud DNS project, a
//! DNSimple account). It resolves domains or previously recorded zone IDs to an
//! [`Advertiser`], a handle bound to a single zone that can write and remove an
//! instance's PTR, SRV and TXT records.
//!
//! The [`ProviderRegistry`] holds providers in their configured order; the
//! first one hosting a zone that covers a domain wins.

pub mod auth;
pub mod change_set;
pub mod clouddns;
pub mod diff;
pub mod dnsimple;
pub mod errors;
pub mod http;

#[cfg(test)]
pub(crate) mod conformance;

use async_trait::async_trait;
use std::sync::Arc;

use crate::dnssd::ServiceInstance;

pub use change_set::{AdvertiseResult, Change, ChangeSet, UnadvertiseResult};
pub use errors::ProviderError;

/// Writes and removes DNS-SD records in one zone.
///
/// Both operations converge on the desired state and are safe to repeat or to
/// run concurrently for the same instance.
#[async_trait]
pub trait Advertiser: Send + Sync {
    /// Opaque zone identifier, recorded in status and passed back to
    /// [`Provider::advertiser_by_id`]
    fn id(&self) -> &str;

    /// Zone apex name, for logging
    fn zone_name(&self) -> &str;

    /// Ensure the instance's PTR entry, SRV record and TXT records exist with
    /// the desired content.
    async fn advertise(&self, instance: &ServiceInstance) -> Result<ChangeSet, ProviderError>;

    /// Remove the instance's PTR entry, SRV record and TXT records. Absent
    /// records are not an error.
    async fn unadvertise(&self, instance: &ServiceInstance) -> Result<ChangeSet, ProviderError>;
}

/// One configured DNS backend.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identifier, unique per configured backend (e.g. `clouddns/my-project`)
    fn id(&self) -> &str;

    /// Human-readable label for logs and status
    fn describe(&self) -> &str;

    /// Advertiser for the most specific zone hosted by this backend that covers
    /// `domain`, or `None` if no hosted zone does.
    async fn advertiser_by_domain(
        &self,
        domain: &str,
    ) -> Result<Option<Box<dyn Advertiser>>, ProviderError>;

    /// Advertiser for a previously recorded zone identifier.
    ///
    /// Fails with [`ProviderError::ZoneNotFound`] if the zone is gone.
    async fn advertiser_by_id(&self, id: &str) -> Result<Box<dyn Advertiser>, ProviderError>;
}

/// A provider together with the advertiser it resolved.
pub struct Resolved {
    pub provider: Arc<dyn Provider>,
    pub advertiser: Box<dyn Advertiser>,
}

impl std::fmt::Debug for Resolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolved")
            .field("provider", &self.provider.id())
            .field("advertiser", &self.advertiser.id())
            .finish()
    }
}

/// Configured providers, in lookup order.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn Provider>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        Self { providers }
    }

    /// Append a provider after the existing ones
    pub fn push(&mut self, provider: Arc<dyn Provider>) {
        self.providers.push(provider);
    }

    /// Find the first provider hosting a zone that covers `domain`.
    ///
    /// # Errors
    ///
    /// Returns the first provider error encountered; later providers are not
    /// consulted, since skipping a failing provider could resolve the domain
    /// to a different backend than the one that actually hosts it.
    pub async fn resolve_domain(&self, domain: &str) -> Result<Option<Resolved>, ProviderError> {
        for provider in &self.providers {
            if let Some(advertiser) = provider.advertiser_by_domain(domain).await? {
                return Ok(Some(Resolved {
                    provider: Arc::clone(provider),
                    advertiser,
                }));
            }
        }
        Ok(None)
    }

    /// Provider with the given ID
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<dyn Provider>> {
        self.providers.iter().find(|p| p.id() == id).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Provider>> {
        self.providers.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|p| p.id()))
            .finish()
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
