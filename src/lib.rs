// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # dnssd-operator - DNS-SD Service Advertisement for Kubernetes
//!
//! A Kubernetes operator that publishes DNS-based Service Discovery (RFC 6763)
//! records for `DNSSDServiceInstance` resources in hosted DNS zones.
//!
//! ## Overview
//!
//! For every instance the operator maintains three kinds of records in the
//! zone that hosts the instance's domain:
//!
//! - a **PTR** entry at the enumeration domain (`_ipp._tcp.example.com`)
//!   naming the instance, shared with every other instance of the service
//! - an **SRV** record at the instance name giving host, port, priority and weight
//! - one **TXT** record per attribute set at the instance name
//!
//! Records are removed when the resource is deleted; a finalizer holds the
//! deletion until they are gone.
//!
//! ## Modules
//!
//! - [`crd`] - The `DNSSDServiceInstance` custom resource
//! - [`dnssd`] - Service instances and the records they map to
//! - [`provider`] - DNS backends (Cloud DNS, DNSimple) and their advertisers
//! - [`reconcilers`] - The reconciliation engine, status and finalizers
//! - [`verify`] - Checks that a name server serves the desired records
//! - [`config`] - Command-line and environment settings
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use dnssd_operator::crd::DNSSDServiceInstanceSpec;
//! use dnssd_operator::dnssd::{desired_records, ServiceInstance};
//! use std::collections::BTreeMap;
//!
//! let spec = DNSSDServiceInstanceSpec {
//!     name: "Office Printer".to_string(),
//!     service: "_ipp._tcp".to_string(),
//!     domain: "example.com".to_string(),
//!     target_host: "printer.example.com".to_string(),
//!     target_port: 631,
//!     priority: 0,
//!     weight: 0,
//!     attributes: vec![BTreeMap::from([("rp".to_string(), "ipp/print".to_string())])],
//!     ttl: None,
//! };
//!
//! let instance = ServiceInstance::try_from(&spec).unwrap();
//! let records = desired_records(&instance);
//! assert_eq!(records.srv.name, "Office\\032Printer._ipp._tcp.example.com");
//! ```

pub mod config;
pub mod constants;
pub mod crd;
pub mod dnssd;
pub mod metrics;
pub mod provider;
pub mod reconcilers;
pub mod status_reasons;
pub mod verify;
