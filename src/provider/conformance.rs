// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Behaviour every [`Advertiser`] must exhibit, run by each backend's tests
//! against its in-memory API fake.

use super::{Advertiser, Change};
use crate::dnssd::{Attributes, ServiceInstance};
use std::time::Duration;

/// Instance under `_http._tcp.<domain>` with one attribute set
pub(crate) fn instance(name: &str, domain: &str, port: u16) -> ServiceInstance {
    ServiceInstance {
        name: name.to_string(),
        service_type: "_http._tcp".to_string(),
        domain: domain.to_string(),
        target_host: format!("host.{domain}"),
        target_port: port,
        priority: 0,
        weight: 0,
        attributes: vec![Attributes::new().with_pair("path", b"/").with_flag("secure")],
        ttl: Duration::from_secs(60),
    }
}

/// Advertise, re-advertise, update and unadvertise two instances sharing an
/// enumeration domain, checking the reported change sets.
///
/// Leaves `instance-2` advertised so callers can inspect backend state.
pub(crate) async fn run(advertiser: &dyn Advertiser, domain: &str) {
    let first = instance("instance-1", domain, 443);
    let second = instance("instance-2", domain, 443);

    let changes = advertiser.advertise(&first).await.unwrap();
    assert!(changes.is_create(), "first advertise should create: {changes}");

    let changes = advertiser.advertise(&second).await.unwrap();
    assert!(changes.is_create(), "second instance should create: {changes}");

    let changes = advertiser.advertise(&first).await.unwrap();
    assert!(changes.is_empty(), "repeat advertise should be a no-op: {changes}");

    let moved = instance("instance-1", domain, 444);
    let changes = advertiser.advertise(&moved).await.unwrap();
    assert!(!changes.is_create(), "port change is not a create: {changes}");
    assert!(!changes.is_empty(), "port change must write: {changes}");
    assert_eq!(changes.srv, Change::Updated);
    assert_eq!(changes.ptr, Change::None);

    let changes = advertiser.unadvertise(&moved).await.unwrap();
    assert_eq!(changes.ptr, Change::Deleted);
    assert_eq!(changes.srv, Change::Deleted);
    assert_eq!(changes.txt, Change::Deleted);

    let changes = advertiser.unadvertise(&moved).await.unwrap();
    assert!(changes.is_empty(), "second unadvertise should be a no-op: {changes}");

    let never = instance("never-advertised", domain, 80);
    let changes = advertiser.unadvertise(&never).await.unwrap();
    assert!(changes.is_empty(), "unknown instance should be a no-op: {changes}");
}
