// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-record-type outcome of one advertise or unadvertise call.

use std::fmt;
use tracing::warn;

/// What happened to one record type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Change {
    #[default]
    None,
    Created,
    Updated,
    Deleted,
}

impl Change {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }

    /// Combine two outcomes for the same record type.
    ///
    /// Identical outcomes stay as they are, `None` yields to anything, and any
    /// other mix means an existing set was modified.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        match (self, other) {
            (a, b) if a == b => a,
            (Self::None, b) => b,
            (a, Self::None) => a,
            _ => Self::Updated,
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome per record type. Built by advertisers, read by the reconciler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub ptr: Change,
    pub srv: Change,
    pub txt: Change,
}

impl ChangeSet {
    /// Nothing was written: desired and actual state already matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ptr == Change::None && self.srv == Change::None && self.txt == Change::None
    }

    /// Every record of the instance was newly created.
    #[must_use]
    pub fn is_create(&self) -> bool {
        self.ptr == Change::Created && self.srv == Change::Created && self.txt == Change::Created
    }

    fn any(&self, change: Change) -> bool {
        self.ptr == change || self.srv == change || self.txt == change
    }

    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            ptr: self.ptr.merge(other.ptr),
            srv: self.srv.merge(other.srv),
            txt: self.txt.merge(other.txt),
        }
    }
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PTR={} SRV={} TXT={}", self.ptr, self.srv, self.txt)
    }
}

/// Classification of a successful advertise call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdvertiseResult {
    /// Every record was created
    AdvertisedNewInstance,
    /// Some records were updated, deleted, or filled in
    UpdatedExistingInstance,
    /// Nothing needed to change
    InstanceAlreadyAdvertised,
}

impl AdvertiseResult {
    /// Classify a change set.
    ///
    /// Any update or delete is an update. Otherwise no creates means nothing
    /// changed, and all creates means a new instance. A mix of creates and
    /// no-ops (a half-applied advertisement being completed) is reported as an
    /// update and logged.
    #[must_use]
    pub fn from_change_set(changes: &ChangeSet) -> Self {
        if changes.any(Change::Updated) || changes.any(Change::Deleted) {
            Self::UpdatedExistingInstance
        } else if !changes.any(Change::Created) {
            Self::InstanceAlreadyAdvertised
        } else if changes.is_create() {
            Self::AdvertisedNewInstance
        } else {
            warn!(
                changes = %changes,
                "Partial creation while advertising; reporting as an update of an existing instance"
            );
            Self::UpdatedExistingInstance
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AdvertisedNewInstance => "advertised new instance",
            Self::UpdatedExistingInstance => "updated existing instance",
            Self::InstanceAlreadyAdvertised => "instance already advertised",
        }
    }
}

impl fmt::Display for AdvertiseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a successful unadvertise call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnadvertiseResult {
    UnadvertisedExistingInstance,
    InstanceNotAdvertised,
}

impl UnadvertiseResult {
    #[must_use]
    pub fn from_change_set(changes: &ChangeSet) -> Self {
        if changes.is_empty() {
            Self::InstanceNotAdvertised
        } else {
            Self::UnadvertisedExistingInstance
        }
    }
}

#[cfg(test)]
#[path = "change_set_tests.rs"]
mod change_set_tests;
