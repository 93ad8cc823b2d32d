//! Record interpreter for RIR delegation feeds.
//!
//! The five registries publish their delegations in one shared layout:
//!
//! ```text
//! registry|cc|type|start|value|date|status[|extensions...]
//! apnic|CN|ipv4|1.0.1.0|256|20110414|allocated
//! apnic|CN|ipv6|2001:250::|35|20000426|allocated
//! ```
//!
//! For `ipv4` records `value` is a host count, for `ipv6` records it is
//! already a prefix length. Header and summary lines never carry a
//! `registry|economy|family` marker for a concrete economy, so they fall out
//! of the selection naturally.

use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::{Result, RirsetError};

/// Records with fewer fields than this are incomplete and skipped.
const MIN_FIELDS: usize = 5;

/// Address family token as it appears in the third field of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    pub const ALL: [AddressFamily; 2] = [AddressFamily::Ipv4, AddressFamily::Ipv6];

    pub fn as_str(&self) -> &'static str {
        match self {
            AddressFamily::Ipv4 => "ipv4",
            AddressFamily::Ipv6 => "ipv6",
        }
    }

}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AddressFamily {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ipv4" => Ok(AddressFamily::Ipv4),
            "ipv6" => Ok(AddressFamily::Ipv6),
            _ => Err(format!("Unknown address family '{}'. Valid: ipv4, ipv6", s)),
        }
    }
}

/// What to do when a qualifying record cannot be turned into a block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidRecordPolicy {
    /// Log a warning, count the record as skipped and keep going
    #[default]
    Skip,
    /// Abort the run on the first bad record
    Fail,
}

/// One line of a delegation feed, borrowed from the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegationRecord<'a> {
    pub registry: &'a str,
    pub economy: &'a str,
    pub family: AddressFamily,
    pub start: &'a str,
    pub value: &'a str,
    pub date: Option<&'a str>,
    pub status: Option<&'a str>,
}

impl<'a> DelegationRecord<'a> {
    /// Split a pipe-delimited line into its fields.
    pub fn parse(line: &'a str) -> Result<Self> {
        let parts: Vec<&str> = line.split('|').collect();
        if parts.len() < MIN_FIELDS {
            return Err(RirsetError::MalformedRecord(format!(
                "expected at least {} fields, got {}: {}",
                MIN_FIELDS,
                parts.len(),
                line
            )));
        }

        let family = parts[2]
            .parse::<AddressFamily>()
            .map_err(RirsetError::MalformedRecord)?;

        Ok(Self {
            registry: parts[0],
            economy: parts[1],
            family,
            start: parts[3],
            value: parts[4],
            date: parts.get(5).copied().filter(|s| !s.is_empty()),
            status: parts.get(6).copied().filter(|s| !s.is_empty()),
        })
    }

    /// Derive the CIDR block this record delegates.
    pub fn to_block(&self) -> Result<IpNet> {
        derive_block(self.start, self.value, self.family)
    }
}

/// Selects the records of one registry, economy and family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFilter {
    pub registry: String,
    pub economy: String,
    pub family: AddressFamily,
    /// Accepted status values; empty accepts every status
    pub statuses: Vec<String>,
}

impl RecordFilter {
    pub fn new(registry: &str, economy: &str, family: AddressFamily) -> Self {
        Self {
            registry: registry.to_string(),
            economy: economy.to_string(),
            family,
            statuses: Vec::new(),
        }
    }

    pub fn with_statuses(mut self, statuses: Vec<String>) -> Self {
        self.statuses = statuses;
        self
    }

    /// The `registry|economy|family` substring a qualifying line contains.
    pub fn marker(&self) -> String {
        format!("{}|{}|{}", self.registry, self.economy, self.family)
    }

    fn accepts_status(&self, status: Option<&str>) -> bool {
        self.statuses.is_empty()
            || status.is_some_and(|s| self.statuses.iter().any(|accepted| accepted == s))
    }
}

/// Blocks derived from one feed for one family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpretation {
    pub family: AddressFamily,
    /// Blocks in feed order, not yet collapsed
    pub blocks: Vec<IpNet>,
    /// Qualifying lines that were malformed or failed derivation
    pub skipped: usize,
    /// Well-formed records rejected by the status filter
    pub filtered: usize,
}

impl Interpretation {
    /// Canonical `address/prefix` strings of the raw blocks.
    pub fn cidrs(&self) -> Vec<String> {
        self.blocks.iter().map(|b| b.to_string()).collect()
    }
}

fn strip_line_ending(line: &str) -> &str {
    line.trim_end_matches('\r')
}

/// Records picked out of a feed for one filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection<'a> {
    /// Qualifying records in feed order
    pub records: Vec<DelegationRecord<'a>>,
    /// Marker-matching lines with fewer than five fields
    pub incomplete: usize,
    /// Well-formed records rejected by the status filter
    pub filtered: usize,
}

/// Pick out the records matching `filter`.
///
/// A line qualifies when it contains the filter's marker. Lines with fewer
/// than five fields, and records rejected by the status filter, are dropped
/// and counted.
pub fn select_records<'a, S: AsRef<str>>(lines: &'a [S], filter: &RecordFilter) -> Selection<'a> {
    let marker = filter.marker();
    let mut selection = Selection {
        records: Vec::new(),
        incomplete: 0,
        filtered: 0,
    };

    for line in lines.iter().map(|line| strip_line_ending(line.as_ref())) {
        if !line.contains(marker.as_str()) {
            continue;
        }

        match DelegationRecord::parse(line) {
            Ok(record) if filter.accepts_status(record.status) => selection.records.push(record),
            Ok(_) => selection.filtered += 1,
            Err(e) => {
                debug!("Skipping line: {}", e);
                selection.incomplete += 1;
            }
        }
    }

    selection
}

/// Interpret every qualifying record into a block.
///
/// Selection goes through [`select_records`]; incomplete lines are always
/// skipped. Records that parse but cannot be turned into a block are
/// handled according to `policy`.
pub fn interpret<S: AsRef<str>>(
    lines: &[S],
    filter: &RecordFilter,
    policy: InvalidRecordPolicy,
) -> Result<Interpretation> {
    let selection = select_records(lines, filter);
    let mut interpretation = Interpretation {
        family: filter.family,
        blocks: Vec::with_capacity(selection.records.len()),
        skipped: selection.incomplete,
        filtered: selection.filtered,
    };

    for record in &selection.records {
        match record.to_block() {
            Ok(block) => interpretation.blocks.push(block),
            Err(e) => match policy {
                InvalidRecordPolicy::Skip => {
                    warn!("Skipping record: {}", e);
                    interpretation.skipped += 1;
                }
                InvalidRecordPolicy::Fail => return Err(e),
            },
        }
    }

    debug!(
        "{}: {} blocks, {} skipped, {} filtered",
        filter.marker(),
        interpretation.blocks.len(),
        interpretation.skipped,
        interpretation.filtered
    );

    Ok(interpretation)
}

/// Derive the block for a start address and a size field.
///
/// # Examples
/// ```
/// use rirset::delegation::{derive_block, AddressFamily};
/// let block = derive_block("1.2.3.0", "256", AddressFamily::Ipv4).unwrap();
/// assert_eq!(block.to_string(), "1.2.3.0/24");
/// let block = derive_block("2001:db8::", "32", AddressFamily::Ipv6).unwrap();
/// assert_eq!(block.to_string(), "2001:db8::/32");
/// ```
pub fn derive_block(start: &str, size: &str, family: AddressFamily) -> Result<IpNet> {
    match family {
        AddressFamily::Ipv4 => derive_v4(start.trim(), size.trim()).map(IpNet::V4),
        AddressFamily::Ipv6 => derive_v6(start.trim(), size.trim()).map(IpNet::V6),
    }
}

/// Prefix length of the smallest block holding `host_count` addresses.
///
/// Computed as `32 - bit_length(host_count - 1)`, so a count that is not a
/// power of two rounds up to the next covering block. Returns `None` for a
/// zero count or a count that would need a /0.
///
/// # Examples
/// ```
/// use rirset::delegation::ipv4_prefix_len;
/// assert_eq!(ipv4_prefix_len(256), Some(24));
/// assert_eq!(ipv4_prefix_len(1), Some(32));
/// assert_eq!(ipv4_prefix_len(3), Some(30));
/// assert_eq!(ipv4_prefix_len(0), None);
/// ```
pub fn ipv4_prefix_len(host_count: u64) -> Option<u8> {
    if host_count == 0 {
        return None;
    }
    let bits = u64::BITS - (host_count - 1).leading_zeros();
    if bits >= 32 {
        None
    } else {
        Some(32 - bits as u8)
    }
}

fn derive_v4(start: &str, size: &str) -> Result<Ipv4Net> {
    let family = AddressFamily::Ipv4;
    let addr: Ipv4Addr = start.parse().map_err(|_| RirsetError::InvalidAddress {
        family,
        value: start.to_string(),
    })?;

    let host_count: u64 = size.parse().map_err(|_| invalid_size(family, size, "not a host count"))?;
    let prefix_len = match ipv4_prefix_len(host_count) {
        Some(p) => p,
        None if host_count == 0 => {
            return Err(invalid_size(family, size, "host count must be positive"))
        }
        None => {
            return Err(invalid_size(
                family,
                size,
                "host count yields a zero-length prefix",
            ))
        }
    };

    let net = Ipv4Net::new(addr, prefix_len)
        .map_err(|e| invalid_size(family, size, &e.to_string()))?;
    Ok(canonical_v4(net))
}

fn derive_v6(start: &str, size: &str) -> Result<Ipv6Net> {
    let family = AddressFamily::Ipv6;
    let addr: Ipv6Addr = start.parse().map_err(|_| RirsetError::InvalidAddress {
        family,
        value: start.to_string(),
    })?;

    let prefix_len: u8 = size
        .parse()
        .map_err(|_| invalid_size(family, size, "not a prefix length"))?;
    if prefix_len == 0 {
        return Err(invalid_size(family, size, "prefix length must be positive"));
    }

    let net = Ipv6Net::new(addr, prefix_len)
        .map_err(|_| invalid_size(family, size, "prefix length exceeds 128"))?;
    Ok(canonical_v6(net))
}

fn canonical_v4(net: Ipv4Net) -> Ipv4Net {
    if net.addr() != net.network() {
        debug!("{} has host bits set, using {}", net, net.trunc());
    }
    net.trunc()
}

fn canonical_v6(net: Ipv6Net) -> Ipv6Net {
    if net.addr() != net.network() {
        debug!("{} has host bits set, using {}", net, net.trunc());
    }
    net.trunc()
}

fn invalid_size(family: AddressFamily, value: &str, reason: &str) -> RirsetError {
    RirsetError::InvalidSize {
        family,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
