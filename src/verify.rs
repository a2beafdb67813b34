// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Resolver-side convergence check.
//!
//! Queries an authoritative name server for an instance's PTR, SRV and TXT
//! records and compares the answers with [`desired_records`]. Used by the live
//! integration tests and by operators debugging a zone by hand.
//!
//! # Example
//!
//! ```rust,no_run
//! use dnssd_operator::dnssd::ServiceInstance;
//! use dnssd_operator::verify::verify_instance;
//!
//! async fn check(instance: &ServiceInstance) -> anyhow::Result<()> {
//!     verify_instance("203.0.113.53:53", instance).await
//! }
//! ```

use anyhow::{bail, Context, Result};
use hickory_client::client::{AsyncClient, ClientHandle};
use hickory_client::rr::{DNSClass, Name, RData, Record, RecordType};
use hickory_client::udp::UdpClientStream;
use std::net::SocketAddr;
use std::str::FromStr;
use tracing::debug;

use crate::dnssd::records::{desired_records, DesiredRecords, RecordData, SrvData, TxtData};
use crate::dnssd::{names_equal, ServiceInstance};

/// Records a name server returned for one instance.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObservedRecords {
    /// Targets of the PTR records at the enumeration domain
    pub ptr_targets: Vec<String>,
    pub srv: Vec<SrvData>,
    pub txt: Vec<TxtData>,
}

impl ObservedRecords {
    /// Collect PTR, SRV and TXT data from answer records. Other types are ignored.
    #[must_use]
    pub fn from_answers<'a>(answers: impl IntoIterator<Item = &'a Record>) -> Self {
        let mut observed = Self::default();
        for record in answers {
            match record.data() {
                Some(RData::PTR(ptr)) => observed.ptr_targets.push(name_text(&ptr.0)),
                Some(RData::SRV(srv)) => observed.srv.push(SrvData {
                    priority: srv.priority(),
                    weight: srv.weight(),
                    port: srv.port(),
                    target: name_text(srv.target()),
                }),
                Some(RData::TXT(txt)) => observed.txt.push(TxtData::new(
                    txt.txt_data().iter().map(|s| s.to_vec()).collect(),
                )),
                _ => {}
            }
        }
        observed
    }
}

fn name_text(name: &Name) -> String {
    name.to_string().trim_end_matches('.').to_string()
}

/// Differences between the desired records and what a server returned.
///
/// Empty when the server is converged: the PTR set contains the instance name,
/// there is exactly one SRV record with the desired fields, and the TXT
/// records carry the desired character-strings (in order within each record;
/// the records themselves may come back in any order).
#[must_use]
pub fn mismatches(desired: &DesiredRecords, observed: &ObservedRecords) -> Vec<String> {
    let mut problems = Vec::new();

    if let RecordData::PTR(instance_name) = &desired.ptr.data {
        if !observed
            .ptr_targets
            .iter()
            .any(|t| names_equal(t, instance_name))
        {
            problems.push(format!(
                "PTR {} does not list {}",
                desired.ptr.name, instance_name
            ));
        }
    }

    if let RecordData::SRV(want) = &desired.srv.data {
        match observed.srv.as_slice() {
            [got] if got.matches(want) => {}
            [got] => problems.push(format!(
                "SRV {} is '{}', want '{}'",
                desired.srv.name,
                got.presentation(),
                want.presentation()
            )),
            other => problems.push(format!(
                "expected one SRV record at {}, found {}",
                desired.srv.name,
                other.len()
            )),
        }
    }

    let mut want_txt: Vec<Vec<u8>> = desired.txt_data().iter().map(TxtData::to_wire).collect();
    let mut got_txt: Vec<Vec<u8>> = observed.txt.iter().map(TxtData::to_wire).collect();
    want_txt.sort();
    got_txt.sort();
    if want_txt != got_txt {
        problems.push(format!(
            "TXT at {} is [{}], want [{}]",
            desired.srv.name,
            observed
                .txt
                .iter()
                .map(TxtData::presentation)
                .collect::<Vec<_>>()
                .join(", "),
            desired
                .txt_data()
                .iter()
                .map(TxtData::presentation)
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    problems
}

/// Query `server` for the records of one type at `name`.
///
/// # Errors
///
/// Returns an error if the name is invalid or the query fails.
pub async fn query(server: SocketAddr, name: &str, record_type: RecordType) -> Result<Vec<Record>> {
    let stream = UdpClientStream::<tokio::net::UdpSocket>::new(server);
    let (mut client, bg) = AsyncClient::connect(stream)
        .await
        .with_context(|| format!("Failed to connect to DNS server {server}"))?;
    tokio::spawn(bg);

    let name = Name::from_str(&format!("{}.", name.trim_end_matches('.')))
        .with_context(|| format!("Invalid record name: {name}"))?;

    let response = client
        .query(name.clone(), DNSClass::IN, record_type)
        .await
        .with_context(|| format!("Failed to query {record_type} records for {name} on {server}"))?;

    Ok(response
        .answers()
        .iter()
        .filter(|r| r.record_type() == record_type)
        .cloned()
        .collect())
}

/// Fetch the records `server` currently serves for `instance`.
///
/// # Errors
///
/// Returns an error if the server address is invalid or any query fails.
pub async fn observe(server: &str, instance: &ServiceInstance) -> Result<ObservedRecords> {
    let server: SocketAddr = server
        .parse()
        .with_context(|| format!("Invalid DNS server address: {server}"))?;

    let instance_name = instance.instance_name();
    let ptr = query(server, &instance.enumeration_domain(), RecordType::PTR).await?;
    let srv = query(server, &instance_name, RecordType::SRV).await?;
    let txt = query(server, &instance_name, RecordType::TXT).await?;

    Ok(ObservedRecords::from_answers(
        ptr.iter().chain(srv.iter()).chain(txt.iter()),
    ))
}

/// Check that `server` serves exactly the records `instance` should have.
///
/// # Errors
///
/// Returns an error listing every mismatch, or if a query fails.
pub async fn verify_instance(server: &str, instance: &ServiceInstance) -> Result<()> {
    let observed = observe(server, instance).await?;
    let problems = mismatches(&desired_records(instance), &observed);

    if problems.is_empty() {
        debug!(
            instance = %instance.instance_name(),
            server = %server,
            "Records converged"
        );
        return Ok(());
    }
    bail!(
        "{} not converged on {}: {}",
        instance.instance_name(),
        server,
        problems.join("; ")
    )
}

#[cfg(test)]
#[path = "verify_tests.rs"]
mod verify_tests;
