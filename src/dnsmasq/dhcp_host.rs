//! `dhcp-host=` reservation parsing and formatting.
//!
//! dnsmasq accepts a comma-separated mix of MAC addresses, an IP
//! address, a hostname, a lease duration, tag constructs (`set:`,
//! `tag:`, `id:`) and the `ignore` keyword, in any order. The parser
//! classifies tokens best-effort and keeps the original value text so
//! untouched lines write back byte-for-byte.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::directive::split_comment;

static MAC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i)[0-9a-f]{2}(?::[0-9a-f]{2}){5}$").expect("valid regex"));

static LEASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d+[smhdw]?|infinite)$").expect("valid regex"));

/// One DHCP reservation from a `dhcp-host=` line.
///
/// Entries sourced from the managed file are editable; entries collected
/// from other files in the config set exist only for conflict checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DhcpHostEntry {
    /// Stable identifier used to match incoming edits to file positions.
    /// Derived from content, not position — see [`IdAllocator`].
    #[serde(default)]
    pub id: String,

    /// MAC addresses, in written order.
    #[serde(default)]
    pub macs: Vec<String>,

    /// Reserved IP address, if present (kept textual for passthrough).
    #[serde(default)]
    pub address: Option<String>,

    /// Hostname, if present.
    #[serde(default)]
    pub hostname: Option<String>,

    /// Lease duration token (`12h`, `infinite`, ...), if present.
    #[serde(default)]
    pub lease: Option<String>,

    /// Tokens the tool passes through untouched (`set:`, `tag:`,
    /// `id:`, and anything it cannot classify).
    #[serde(default)]
    pub extras: Vec<String>,

    /// Inline comment after the value, without the `#`.
    #[serde(default)]
    pub comment: Option<String>,

    /// Original value text. Present on parsed entries so unedited lines
    /// round-trip byte-for-byte; cleared when an edit reformats the line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_value: Option<String>,

    /// The line is commented out (`#dhcp-host=...`): a disabled entry.
    #[serde(default)]
    pub is_comment: bool,

    /// The `ignore` keyword is present (dnsmasq refuses this host).
    #[serde(default)]
    pub ignore: bool,

    /// Marks an incoming entry for removal on write.
    #[serde(default)]
    pub is_deleted: bool,

    /// True only when sourced from the managed file.
    #[serde(default)]
    pub is_editable: bool,

    /// File this entry was read from, when known.
    #[serde(default)]
    pub source_path: Option<PathBuf>,
}

impl DhcpHostEntry {
    /// Parses the value part of a `dhcp-host=` line.
    ///
    /// Never fails: tokens that do not classify land in `extras`, and
    /// the whole original text is retained in `raw_value`.
    #[must_use]
    pub fn parse_value(value: &str, is_comment: bool) -> Self {
        let (content, comment) = split_comment(value);

        let mut entry = Self {
            raw_value: Some(value.to_string()),
            comment: comment.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
            is_comment,
            ..Self::default()
        };

        for token in content.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            entry.classify(token);
        }

        entry
    }

    fn classify(&mut self, token: &str) {
        if MAC.is_match(token) {
            self.macs.push(token.to_string());
        } else if token == "ignore" {
            self.ignore = true;
        } else if token.contains(':') {
            // set:/tag:/id: and friends, or bracketed IPv6 — passthrough.
            if self.address.is_none() && is_bracketed_ipv6(token) {
                self.address = Some(token.to_string());
            } else {
                self.extras.push(token.to_string());
            }
        } else if self.address.is_none() && token.parse::<std::net::Ipv4Addr>().is_ok() {
            self.address = Some(token.to_string());
        } else if self.hostname.is_none() && !LEASE.is_match(token) {
            self.hostname = Some(token.to_string());
        } else if self.lease.is_none() && LEASE.is_match(token) {
            self.lease = Some(token.to_string());
        } else {
            self.extras.push(token.to_string());
        }
    }

    /// Serializes the entry back to a `dhcp-host=` value.
    ///
    /// Parsed, unedited entries reproduce their original text; entries
    /// built or edited through the API format canonically:
    /// MACs, tags, address, hostname, lease, `ignore`, inline comment.
    #[must_use]
    pub fn to_value(&self) -> String {
        if let Some(raw) = &self.raw_value {
            return raw.clone();
        }

        let mut parts: Vec<&str> = self.macs.iter().map(String::as_str).collect();
        parts.extend(self.extras.iter().map(String::as_str));
        if let Some(address) = &self.address {
            parts.push(address);
        }
        if let Some(hostname) = &self.hostname {
            parts.push(hostname);
        }
        if let Some(lease) = &self.lease {
            parts.push(lease);
        }
        if self.ignore {
            parts.push("ignore");
        }

        let mut value = parts.join(",");
        if let Some(comment) = &self.comment {
            value.push_str(" # ");
            value.push_str(comment);
        }
        value
    }

    /// Prepares an incoming entry for writing.
    ///
    /// An entry that carries structured content is reformatted from its
    /// fields, so stale `raw_value` text from a round-tripped DTO cannot
    /// shadow the edit. Entries with no structured content keep their
    /// raw text (the unparsable-line passthrough case).
    #[must_use]
    pub fn normalized_for_write(mut self) -> Self {
        let has_structure = !self.macs.is_empty()
            || self.address.is_some()
            || self.hostname.is_some()
            || self.lease.is_some()
            || !self.extras.is_empty()
            || self.ignore;
        if has_structure {
            self.raw_value = None;
        }
        self
    }

    /// The identity content key: sorted MACs, address and hostname.
    ///
    /// `None` when the entry has none of the three (identity must then
    /// fall back to the line position).
    #[must_use]
    pub fn content_key(&self) -> Option<String> {
        if self.macs.is_empty() && self.address.is_none() && self.hostname.is_none() {
            return None;
        }

        let mut macs: Vec<String> = self.macs.iter().map(|m| m.to_lowercase()).collect();
        macs.sort();

        Some(format!(
            "{}|{}|{}",
            macs.join(","),
            self.address.as_deref().unwrap_or(""),
            self.hostname.as_deref().unwrap_or(""),
        ))
    }

    /// MACs in lowercase, for collision checks.
    #[must_use]
    pub fn normalized_macs(&self) -> Vec<String> {
        self.macs.iter().map(|m| m.to_lowercase()).collect()
    }
}

/// Assigns stable ids to entries in file order.
///
/// The id is the content key alone while unique within the file; a
/// second entry with the same key gets `:<line>` appended, and entries
/// with no identifying content at all get `line:<line>`. This keeps ids
/// deterministic for fixed content and stable when unrelated lines move.
#[derive(Debug, Default)]
pub struct IdAllocator {
    seen: std::collections::HashSet<String>,
}

impl IdAllocator {
    /// Creates an allocator with no keys seen.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Derives and stores the id for `entry` found at `line_number`.
    pub fn assign(&mut self, entry: &mut DhcpHostEntry, line_number: usize) {
        entry.id = match entry.content_key() {
            None => format!("line:{line_number}"),
            Some(key) => {
                if self.seen.insert(key.clone()) {
                    key
                } else {
                    format!("{key}:{line_number}")
                }
            }
        };
    }
}

/// Extracts the reservations from parsed lines, in file order, with
/// stable ids assigned and provenance stamped.
#[must_use]
pub fn collect_dhcp_hosts(
    lines: &[super::line::ConfigLine],
    source: Option<&std::path::Path>,
    editable: bool,
) -> Vec<DhcpHostEntry> {
    let mut ids = IdAllocator::new();
    let mut entries = Vec::new();

    for line in lines {
        if let super::line::LineKind::DhcpHost { entry } = &line.kind {
            let mut entry = entry.clone();
            ids.assign(&mut entry, line.number);
            entry.is_editable = editable;
            entry.source_path = source.map(std::path::Path::to_path_buf);
            entries.push(entry);
        }
    }

    entries
}

fn is_bracketed_ipv6(token: &str) -> bool {
    token
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .is_some_and(|inner| inner.parse::<std::net::Ipv6Addr>().is_ok())
}
