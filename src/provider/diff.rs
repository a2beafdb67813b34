// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Record diffing shared by all advertisers.
//!
//! Backends read whatever they hold at the enumeration domain and instance
//! name into [`ExistingRecords`]; the functions here decide, per record type,
//! what has to happen. Backends then translate the resulting [`ChangeSet`]
//! into API calls.
//!
//! The PTR set at the enumeration domain is shared by every instance of the
//! service type, so only this instance's entry is ever added or removed. SRV
//! and TXT sets belong to the instance alone and are replaced wholesale.

use super::change_set::{Change, ChangeSet};
use crate::dnssd::{names_equal, DesiredRecords, Record, RecordData};

/// Records currently held by a backend for one instance.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExistingRecords {
    /// Every PTR entry at the enumeration domain, including other instances'
    pub ptr: Vec<Record>,
    /// SRV records at the instance name
    pub srv: Vec<Record>,
    /// TXT records at the instance name, in backend order
    pub txt: Vec<Record>,
}

impl ExistingRecords {
    /// Whether the PTR set already holds an entry for `instance_name`
    #[must_use]
    pub fn has_ptr_to(&self, instance_name: &str) -> bool {
        self.ptr
            .iter()
            .any(|r| matches!(&r.data, RecordData::PTR(target) if names_equal(target, instance_name)))
    }
}

/// Changes needed to make `existing` match `desired`.
#[must_use]
pub fn plan_advertise(existing: &ExistingRecords, desired: &DesiredRecords) -> ChangeSet {
    let instance_name = match &desired.ptr.data {
        RecordData::PTR(target) => target.as_str(),
        _ => desired.srv.name.as_str(),
    };

    let ptr = if existing.has_ptr_to(instance_name) {
        Change::None
    } else {
        Change::Created
    };

    ChangeSet {
        ptr,
        srv: replace_change(&existing.srv, std::slice::from_ref(&desired.srv)),
        txt: replace_change(&existing.txt, &desired.txt),
    }
}

/// Changes needed to remove the instance from `existing`.
#[must_use]
pub fn plan_unadvertise(existing: &ExistingRecords, instance_name: &str) -> ChangeSet {
    let removed = |present: bool| {
        if present {
            Change::Deleted
        } else {
            Change::None
        }
    };

    ChangeSet {
        ptr: removed(existing.has_ptr_to(instance_name)),
        srv: removed(!existing.srv.is_empty()),
        txt: removed(!existing.txt.is_empty()),
    }
}

/// Replace-or-create-or-noop for an instance-owned record set.
///
/// Sets are compared as multisets of (TTL, data): a backend may return an
/// RRset in any order. Character-strings inside one TXT record keep their
/// order.
fn replace_change(existing: &[Record], desired: &[Record]) -> Change {
    if existing.is_empty() {
        return Change::Created;
    }

    let pairing = pair_records(existing, desired);
    if pairing.is_exact() {
        Change::None
    } else {
        Change::Updated
    }
}

/// Records of two sets that have no equal counterpart in the other set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Pairing {
    /// Indices into the existing set, in order
    pub stale: Vec<usize>,
    /// Indices into the desired set, in order
    pub missing: Vec<usize>,
}

impl Pairing {
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.stale.is_empty() && self.missing.is_empty()
    }
}

/// Match every desired record with an equal, not yet matched existing record.
///
/// What remains on either side is what a backend has to update, create or
/// delete.
#[must_use]
pub fn pair_records(existing: &[Record], desired: &[Record]) -> Pairing {
    let mut taken = vec![false; existing.len()];
    let mut pairing = Pairing::default();

    for (want_index, want) in desired.iter().enumerate() {
        let found = existing.iter().enumerate().position(|(index, have)| {
            !taken[index] && have.ttl == want.ttl && have.data.matches(&want.data)
        });
        match found {
            Some(index) => taken[index] = true,
            None => pairing.missing.push(want_index),
        }
    }

    pairing.stale = taken
        .iter()
        .enumerate()
        .filter(|(_, matched)| !**matched)
        .map(|(index, _)| index)
        .collect();
    pairing
}

#[cfg(test)]
#[path = "diff_tests.rs"]
mod diff_tests;
