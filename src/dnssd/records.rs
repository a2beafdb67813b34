// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! PTR, SRV and TXT records derived from a [`ServiceInstance`].
//!
//! Record data has two textual forms: the presentation form used in zone files
//! and by most provider APIs, and (for TXT) the length-prefixed wire form. The
//! parsers here are deliberately tolerant of what providers send back: trailing
//! dots, mixed case and unquoted TXT strings are all accepted.

use super::{fqdn, names_equal, ServiceInstance};
use std::fmt;

/// Record types managed by the operator
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordType {
    PTR,
    SRV,
    TXT,
}

impl RecordType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PTR => "PTR",
            Self::SRV => "SRV",
            Self::TXT => "TXT",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SRV record data
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SrvData {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    /// Target host, without a trailing dot
    pub target: String,
}

impl SrvData {
    /// `priority weight port target.`
    #[must_use]
    pub fn presentation(&self) -> String {
        format!(
            "{} {} {} {}",
            self.priority,
            self.weight,
            self.port,
            fqdn(&self.target)
        )
    }

    /// Parse the presentation form.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the input is not four
    /// whitespace-separated fields with numeric priority, weight and port.
    pub fn parse(text: &str) -> Result<Self, String> {
        let fields: Vec<&str> = text.split_whitespace().collect();
        let [priority, weight, port, target] = fields.as_slice() else {
            return Err(format!("expected 4 SRV fields, got {}: '{text}'", fields.len()));
        };

        let number = |field: &str, what: &str| {
            field
                .parse::<u16>()
                .map_err(|e| format!("invalid SRV {what} '{field}': {e}"))
        };

        Ok(Self {
            priority: number(priority, "priority")?,
            weight: number(weight, "weight")?,
            port: number(port, "port")?,
            target: target.trim_end_matches('.').to_string(),
        })
    }

    /// Equality ignoring target case and trailing dot
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.priority == other.priority
            && self.weight == other.weight
            && self.port == other.port
            && names_equal(&self.target, &other.target)
    }
}

/// TXT record data: an ordered list of character-strings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxtData {
    segments: Vec<Vec<u8>>,
}

impl TxtData {
    /// TXT data from raw segments. No segments yields a record holding a
    /// single empty string, since a TXT record cannot be empty.
    #[must_use]
    pub fn new(segments: Vec<Vec<u8>>) -> Self {
        if segments.is_empty() {
            Self {
                segments: vec![Vec::new()],
            }
        } else {
            Self { segments }
        }
    }

    #[must_use]
    pub fn segments(&self) -> &[Vec<u8>] {
        &self.segments
    }

    /// RDATA wire form: each segment prefixed with its length byte.
    ///
    /// Segments longer than 255 bytes are truncated; validated instances never
    /// produce them.
    #[must_use]
    pub fn to_wire(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for segment in &self.segments {
            let len = segment.len().min(255);
            out.push(u8::try_from(len).unwrap_or(u8::MAX));
            out.extend_from_slice(&segment[..len]);
        }
        out
    }

    /// Presentation form: quoted strings separated by a space
    #[must_use]
    pub fn presentation(&self) -> String {
        self.presentation_strings().join(" ")
    }

    /// Each segment quoted and escaped on its own
    #[must_use]
    pub fn presentation_strings(&self) -> Vec<String> {
        self.segments.iter().map(|s| quote_segment(s)).collect()
    }

    /// Parse presentation text: quoted or bare strings with `\X` and `\DDD`
    /// escapes.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem for an unterminated quote or a
    /// malformed decimal escape.
    pub fn parse(text: &str) -> Result<Self, String> {
        let bytes = text.as_bytes();
        let mut segments = Vec::new();
        let mut i = 0;

        while i < bytes.len() {
            if bytes[i].is_ascii_whitespace() {
                i += 1;
                continue;
            }

            let quoted = bytes[i] == b'"';
            if quoted {
                i += 1;
            }

            let mut segment = Vec::new();
            let mut closed = !quoted;
            while i < bytes.len() {
                let b = bytes[i];
                if quoted && b == b'"' {
                    closed = true;
                    i += 1;
                    break;
                }
                if !quoted && b.is_ascii_whitespace() {
                    break;
                }
                if b == b'\\' {
                    let (value, used) = parse_escape(&bytes[i + 1..])
                        .ok_or_else(|| format!("invalid escape in TXT data '{text}'"))?;
                    segment.push(value);
                    i += 1 + used;
                } else {
                    segment.push(b);
                    i += 1;
                }
            }

            if !closed {
                return Err(format!("unterminated quoted string in TXT data '{text}'"));
            }
            segments.push(segment);
        }

        Ok(Self::new(segments))
    }
}

impl fmt::Display for TxtData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.presentation())
    }
}

fn quote_segment(segment: &[u8]) -> String {
    let mut out = String::with_capacity(segment.len() + 2);
    out.push('"');
    for &b in segment {
        match b {
            b'"' | b'\\' => {
                out.push('\\');
                out.push(char::from(b));
            }
            0x20..=0x7e => out.push(char::from(b)),
            _ => out.push_str(&format!("\\{b:03}")),
        }
    }
    out.push('"');
    out
}

fn parse_escape(rest: &[u8]) -> Option<(u8, usize)> {
    let first = *rest.first()?;
    if first.is_ascii_digit() {
        let digits = rest.get(..3)?;
        if !digits.iter().all(u8::is_ascii_digit) {
            return None;
        }
        let value = digits
            .iter()
            .fold(0u16, |acc, d| acc * 10 + u16::from(d - b'0'));
        Some((u8::try_from(value).ok()?, 3))
    } else {
        Some((first, 1))
    }
}

/// Record data by type
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordData {
    /// PTR target, without a trailing dot
    PTR(String),
    SRV(SrvData),
    TXT(TxtData),
}

impl RecordData {
    #[must_use]
    pub fn record_type(&self) -> RecordType {
        match self {
            Self::PTR(_) => RecordType::PTR,
            Self::SRV(_) => RecordType::SRV,
            Self::TXT(_) => RecordType::TXT,
        }
    }

    /// Presentation form of the data
    #[must_use]
    pub fn presentation(&self) -> String {
        match self {
            Self::PTR(target) => fqdn(target),
            Self::SRV(srv) => srv.presentation(),
            Self::TXT(txt) => txt.presentation(),
        }
    }

    /// Data equality as a provider would see it (names compared case-insensitively)
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::PTR(a), Self::PTR(b)) => names_equal(a, b),
            (Self::SRV(a), Self::SRV(b)) => a.matches(b),
            (Self::TXT(a), Self::TXT(b)) => a == b,
            _ => false,
        }
    }
}

/// One resource record
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    /// Owner name, without a trailing dot
    pub name: String,
    pub ttl: u32,
    pub data: RecordData,
}

impl Record {
    #[must_use]
    pub fn record_type(&self) -> RecordType {
        self.data.record_type()
    }
}

/// The records that make up an advertised instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DesiredRecords {
    /// Enumeration-domain PTR entry pointing at the instance name
    pub ptr: Record,
    pub srv: Record,
    /// One TXT record per attribute set, in declaration order
    pub txt: Vec<Record>,
}

impl DesiredRecords {
    /// All records, PTR first
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        std::iter::once(&self.ptr)
            .chain(std::iter::once(&self.srv))
            .chain(self.txt.iter())
    }

    /// TXT data in declaration order
    #[must_use]
    pub fn txt_data(&self) -> Vec<TxtData> {
        self.txt
            .iter()
            .filter_map(|r| match &r.data {
                RecordData::TXT(txt) => Some(txt.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Derive the PTR, SRV and TXT records for an instance.
///
/// An instance without attributes still gets one TXT record holding a single
/// empty string, as DNS-SD requires a TXT record at every instance name.
#[must_use]
pub fn desired_records(instance: &ServiceInstance) -> DesiredRecords {
    let instance_name = instance.instance_name();
    let ttl = instance.ttl_secs();

    let ptr = Record {
        name: instance.enumeration_domain(),
        ttl,
        data: RecordData::PTR(instance_name.clone()),
    };

    let srv = Record {
        name: instance_name.clone(),
        ttl,
        data: RecordData::SRV(SrvData {
            priority: instance.priority,
            weight: instance.weight,
            port: instance.target_port,
            target: instance.target_host.trim_end_matches('.').to_string(),
        }),
    };

    let txt = if instance.attributes.is_empty() {
        vec![Record {
            name: instance_name,
            ttl,
            data: RecordData::TXT(TxtData::new(Vec::new())),
        }]
    } else {
        instance
            .attributes
            .iter()
            .map(|attrs| Record {
                name: instance_name.clone(),
                ttl,
                data: RecordData::TXT(TxtData::new(attrs.to_segments())),
            })
            .collect()
    };

    DesiredRecords { ptr, srv, txt }
}

#[cfg(test)]
#[path = "records_tests.rs"]
mod records_tests;
