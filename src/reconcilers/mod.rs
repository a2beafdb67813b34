// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation for `DNSSDServiceInstance` resources.
//!
//! # Reconciliation Architecture
//!
//! The operator follows the standard Kubernetes controller pattern:
//!
//! 1. **Watch** - The controller in `main.rs` watches `DNSSDServiceInstance` objects
//! 2. **Reconcile** - [`DnssdReconciler`] compares the spec with the records in DNS
//! 3. **Update** - The selected [`Advertiser`](crate::provider::Advertiser) converges the records
//! 4. **Status** - The outcome is written back through an [`InstanceStore`]
//!
//! # Modules
//!
//! - [`dnssdserviceinstance`] - The reconciliation engine
//! - [`status`] - Pure builders for each lifecycle status
//! - [`store`] - Status and finalizer write-back
//! - [`finalizers`] - Idempotent finalizer add and remove
//! - [`retry`] - Backoff schedules and Kubernetes API retries
//!
//! # Example: Reconciling One Resource
//!
//! ```rust,no_run
//! use dnssd_operator::crd::DNSSDServiceInstance;
//! use dnssd_operator::provider::ProviderRegistry;
//! use dnssd_operator::reconcilers::{DnssdReconciler, KubeInstanceStore, Timeouts};
//! use kube::Client;
//! use std::sync::Arc;
//!
//! async fn reconcile_once(
//!     client: Client,
//!     registry: ProviderRegistry,
//!     instance: DNSSDServiceInstance,
//! ) -> anyhow::Result<()> {
//!     let store = Arc::new(KubeInstanceStore::new(client));
//!     let reconciler = DnssdReconciler::new(registry, store, Timeouts::default());
//!     let outcome = reconciler.reconcile(&instance).await?;
//!     println!("{outcome:?}");
//!     Ok(())
//! }
//! ```

pub mod dnssdserviceinstance;
pub mod finalizers;
pub mod retry;
pub mod status;
pub mod store;

pub use dnssdserviceinstance::{DnssdReconciler, ReconcileOutcome, Timeouts};
pub use store::{InstanceStore, KubeInstanceStore};
