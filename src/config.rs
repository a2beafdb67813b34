// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator settings.
//!
//! Every setting can be given as a command-line flag or through the
//! environment. The values are read once at startup into [`Settings`] and the
//! provider registry is built from them; nothing reads the environment later.
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `CLOUDDNS_PROJECT` | Enables the Cloud DNS provider for this project |
//! | `CLOUDDNS_ACCESS_TOKEN` | Fixed OAuth2 bearer token for Cloud DNS; never refreshed |
//! | `CLOUDDNS_TOKEN_URL` | Metadata server token endpoint, used when no fixed token is set |
//! | `CLOUDDNS_API_URL` | Cloud DNS API base URL |
//! | `DNSIMPLE_ACCOUNT_ID` | Enables the DNSimple provider for this account |
//! | `DNSIMPLE_TOKEN` | DNSimple API access token |
//! | `DNSIMPLE_API_URL` | DNSimple API base URL |
//! | `METRICS_BIND_ADDRESS` | Address the metrics server listens on |
//! | `METRICS_PORT` | Port the metrics server listens on |
//! | `ADVERTISE_TIMEOUT_SECS` | Deadline for one advertise or unadvertise call |
//! | `STATUS_TIMEOUT_SECS` | Deadline for one status write |

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::constants::{
    ADVERTISE_TIMEOUT_SECS, CLOUDDNS_DEFAULT_API_URL, CLOUDDNS_METADATA_TOKEN_URL,
    DNSIMPLE_DEFAULT_API_URL, METRICS_SERVER_BIND_ADDRESS, METRICS_SERVER_PORT,
    STATUS_WRITE_TIMEOUT_SECS,
};
use crate::provider::auth::{MetadataToken, StaticToken, TokenSource};
use crate::provider::clouddns::{CloudDnsClient, CloudDnsProvider};
use crate::provider::dnsimple::{DnsimpleClient, DnsimpleProvider};
use crate::provider::ProviderRegistry;
use crate::reconcilers::Timeouts;

/// Command-line and environment settings.
#[derive(Clone, Parser)]
#[command(name = "dnssd-operator", version, about)]
pub struct Settings {
    /// Google Cloud project whose Cloud DNS zones may be used
    #[arg(long, env = "CLOUDDNS_PROJECT")]
    pub clouddns_project: Option<String>,

    /// Fixed OAuth2 access token for the Cloud DNS API. Expires after about
    /// an hour; leave unset to fetch refreshing tokens from the metadata server.
    #[arg(long, env = "CLOUDDNS_ACCESS_TOKEN", hide_env_values = true)]
    pub clouddns_access_token: Option<String>,

    /// Metadata server endpoint for Cloud DNS access tokens
    #[arg(long, env = "CLOUDDNS_TOKEN_URL", default_value = CLOUDDNS_METADATA_TOKEN_URL)]
    pub clouddns_token_url: String,

    /// Cloud DNS API base URL
    #[arg(long, env = "CLOUDDNS_API_URL", default_value = CLOUDDNS_DEFAULT_API_URL)]
    pub clouddns_api_url: String,

    /// DNSimple account whose zones may be used
    #[arg(long, env = "DNSIMPLE_ACCOUNT_ID")]
    pub dnsimple_account_id: Option<String>,

    /// DNSimple API access token
    #[arg(long, env = "DNSIMPLE_TOKEN", hide_env_values = true)]
    pub dnsimple_token: Option<String>,

    /// DNSimple API base URL
    #[arg(long, env = "DNSIMPLE_API_URL", default_value = DNSIMPLE_DEFAULT_API_URL)]
    pub dnsimple_api_url: String,

    #[arg(long, env = "METRICS_BIND_ADDRESS", default_value = METRICS_SERVER_BIND_ADDRESS)]
    pub metrics_bind_address: String,

    #[arg(long, env = "METRICS_PORT", default_value_t = METRICS_SERVER_PORT)]
    pub metrics_port: u16,

    /// Seconds allowed for one advertise or unadvertise call, propagation included
    #[arg(long, env = "ADVERTISE_TIMEOUT_SECS", default_value_t = ADVERTISE_TIMEOUT_SECS)]
    pub advertise_timeout_secs: u64,

    /// Seconds allowed for one status write
    #[arg(long, env = "STATUS_TIMEOUT_SECS", default_value_t = STATUS_WRITE_TIMEOUT_SECS)]
    pub status_timeout_secs: u64,
}

impl Settings {
    #[must_use]
    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            advertise: Duration::from_secs(self.advertise_timeout_secs),
            status_write: Duration::from_secs(self.status_timeout_secs),
        }
    }

    /// `host:port` the metrics server binds to
    #[must_use]
    pub fn metrics_address(&self) -> String {
        format!("{}:{}", self.metrics_bind_address, self.metrics_port)
    }

    /// Build the provider registry: Cloud DNS first, then DNSimple.
    ///
    /// A provider is enabled by its project or account setting. DNSimple then
    /// requires its token; Cloud DNS falls back to metadata server tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if DNSimple lacks its token or a provider has an
    /// invalid API or token URL.
    pub fn build_registry(&self) -> Result<ProviderRegistry> {
        let mut registry = ProviderRegistry::default();

        if let Some(project) = non_empty(self.clouddns_project.as_deref()) {
            let tokens = self.clouddns_token()?;
            let client = CloudDnsClient::new(&self.clouddns_api_url, project, tokens)
                .context("Invalid Cloud DNS configuration")?;
            registry.push(Arc::new(CloudDnsProvider::new(project, Arc::new(client))));
        }

        if let Some(account) = non_empty(self.dnsimple_account_id.as_deref()) {
            let Some(token) = non_empty(self.dnsimple_token.as_deref()) else {
                bail!("DNSIMPLE_TOKEN is required when DNSIMPLE_ACCOUNT_ID is set");
            };
            let client = DnsimpleClient::new(&self.dnsimple_api_url, account, token)
                .context("Invalid DNSimple configuration")?;
            registry.push(Arc::new(DnsimpleProvider::new(account, Arc::new(client))));
        }

        Ok(registry)
    }

    fn clouddns_token(&self) -> Result<Arc<dyn TokenSource>> {
        if let Some(token) = non_empty(self.clouddns_access_token.as_deref()) {
            warn!("CLOUDDNS_ACCESS_TOKEN is fixed and will not be refreshed when it expires");
            return Ok(Arc::new(StaticToken::new(token)));
        }
        let source = MetadataToken::new(&self.clouddns_token_url)
            .context("Invalid CLOUDDNS_TOKEN_URL")?;
        Ok(Arc::new(source))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
