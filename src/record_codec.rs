// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Mapping between Service addresses and zone record sets.
//!
//! Everything in this module is pure: no I/O, no errors. Malformed addresses are
//! dropped with a warning so that one bad entry never blocks the rest of a batch.

use std::collections::BTreeSet;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use tracing::warn;

/// DNS record types this controller writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordKind {
    /// IPv4 address record
    A,
    /// IPv6 address record
    Aaaa,
    /// Text record (only used for the zone version marker)
    Txt,
}

impl RecordKind {
    /// Record kinds that carry Service addresses.
    pub const ADDRESS_KINDS: [Self; 2] = [Self::A, Self::Aaaa];

    /// Wire name of the record type (`A`, `AAAA`, `TXT`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
            Self::Txt => "TXT",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record data of a single record set. Address sets are ordered and deduplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    A(BTreeSet<Ipv4Addr>),
    Aaaa(BTreeSet<Ipv6Addr>),
    Txt(Vec<String>),
}

/// A complete record set: everything the zone holds for one `(name, kind)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecordSet {
    /// Record name relative to the zone (e.g. `web.default.svc`)
    pub name: String,
    /// Time to live in seconds
    pub ttl: u32,
    /// Record values
    pub data: RecordData,
}

impl DnsRecordSet {
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        match self.data {
            RecordData::A(_) => RecordKind::A,
            RecordData::Aaaa(_) => RecordKind::Aaaa,
            RecordData::Txt(_) => RecordKind::Txt,
        }
    }

    /// Number of values in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.data {
            RecordData::A(ips) => ips.len(),
            RecordData::Aaaa(ips) => ips.len(),
            RecordData::Txt(values) => values.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values rendered as strings, in set order.
    #[must_use]
    pub fn values(&self) -> Vec<String> {
        match &self.data {
            RecordData::A(ips) => ips.iter().map(ToString::to_string).collect(),
            RecordData::Aaaa(ips) => ips.iter().map(ToString::to_string).collect(),
            RecordData::Txt(values) => values.clone(),
        }
    }

    /// Identifier used in logs and errors, e.g. `"A web.default.svc"`.
    #[must_use]
    pub fn describe(&self) -> String {
        describe_record(&self.name, self.kind())
    }
}

/// Format a `(name, kind)` pair for logs and errors.
#[must_use]
pub fn describe_record(name: &str, kind: RecordKind) -> String {
    format!("{kind} {name}")
}

/// Addresses partitioned by family.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressFamilies {
    pub ipv4: BTreeSet<Ipv4Addr>,
    pub ipv6: BTreeSet<Ipv6Addr>,
}

impl AddressFamilies {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ipv4.is_empty() && self.ipv6.is_empty()
    }

    /// Total number of distinct addresses across both families.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ipv4.len() + self.ipv6.len()
    }

    /// One record set per non-empty family, A first.
    #[must_use]
    pub fn record_sets(&self, name: &str, ttl: u32) -> Vec<DnsRecordSet> {
        let mut sets = Vec::with_capacity(2);
        if !self.ipv4.is_empty() {
            sets.push(DnsRecordSet {
                name: name.to_string(),
                ttl,
                data: RecordData::A(self.ipv4.clone()),
            });
        }
        if !self.ipv6.is_empty() {
            sets.push(DnsRecordSet {
                name: name.to_string(),
                ttl,
                data: RecordData::Aaaa(self.ipv6.clone()),
            });
        }
        sets
    }
}

/// Returns true if the address belongs in the IPv6 bucket.
///
/// An address is IPv6 iff it contains two or more `:` separators.
#[must_use]
pub fn is_ipv6_candidate(address: &str) -> bool {
    address.matches(':').count() >= 2
}

/// Partition addresses by family.
///
/// Each entry is trimmed, bucketed by [`is_ipv6_candidate`], and parsed. Entries
/// that fail to parse as an address of their bucket's family are dropped with a
/// warning. Duplicates collapse.
pub fn classify<S: AsRef<str>>(addresses: &[S]) -> AddressFamilies {
    let mut families = AddressFamilies::default();

    for raw in addresses {
        let address = raw.as_ref().trim();
        if is_ipv6_candidate(address) {
            match address.parse::<Ipv6Addr>() {
                Ok(ip) => {
                    families.ipv6.insert(ip);
                }
                Err(e) => warn!(address = %address, error = %e, "Dropping malformed IPv6 address"),
            }
        } else {
            match address.parse::<Ipv4Addr>() {
                Ok(ip) => {
                    families.ipv4.insert(ip);
                }
                Err(e) => warn!(address = %address, error = %e, "Dropping malformed IPv4 address"),
            }
        }
    }

    families
}

/// Build the record set for `(name, kind)` from raw values.
///
/// For `A` and `AAAA` the values are classified and only the matching family is
/// kept. For `TXT` the values are kept verbatim.
pub fn build_record_set<S: AsRef<str>>(
    name: &str,
    kind: RecordKind,
    values: &[S],
    ttl: u32,
) -> DnsRecordSet {
    let data = match kind {
        RecordKind::A => RecordData::A(classify(values).ipv4),
        RecordKind::Aaaa => RecordData::Aaaa(classify(values).ipv6),
        RecordKind::Txt => RecordData::Txt(values.iter().map(|v| v.as_ref().to_string()).collect()),
    };

    DnsRecordSet {
        name: name.to_string(),
        ttl,
        data,
    }
}

#[cfg(test)]
#[path = "record_codec_tests.rs"]
mod record_codec_tests;
