//! Read-only viewer for the dnsmasq lease database.
//!
//! dnsmasq persists one lease per line: expiry epoch, MAC, IP address,
//! hostname and client-id, with `*` for unknown fields. IPv6 sections
//! start with a `duid` marker line. This viewer never writes.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::dnsmasq::EffectiveConfig;

/// Where dnsmasq keeps leases when `dhcp-leasefile` is not set.
pub const DEFAULT_LEASE_FILE: &str = "/var/lib/misc/dnsmasq.leases";

/// One active DHCP lease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DhcpLease {
    /// Lease expiry as a Unix timestamp; zero means infinite.
    pub expires_at: u64,
    /// Client MAC address.
    pub mac: String,
    /// Leased IP address.
    pub address: String,
    /// Hostname the client reported, if any.
    pub hostname: Option<String>,
    /// Client identifier, if any.
    pub client_id: Option<String>,
}

/// The lease file in effect: the merged `dhcp-leasefile` value, or the
/// dnsmasq default.
#[must_use]
pub fn lease_file_path(effective: &EffectiveConfig) -> PathBuf {
    effective
        .dhcp_lease_file
        .as_deref()
        .map_or_else(|| PathBuf::from(DEFAULT_LEASE_FILE), PathBuf::from)
}

/// Reads the lease database, skipping lines that do not parse.
///
/// A missing file yields an empty list — dnsmasq simply has not handed
/// out a lease yet.
///
/// # Errors
///
/// Fails only on I/O errors other than the file not existing.
pub async fn read_leases(path: &Path) -> std::io::Result<Vec<DhcpLease>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    Ok(content.lines().filter_map(parse_lease_line).collect())
}

fn parse_lease_line(line: &str) -> Option<DhcpLease> {
    let fields: Vec<&str> = line.split_whitespace().collect();

    // The IPv6 section marker and its id line are not leases.
    if fields.first() == Some(&"duid") {
        return None;
    }
    if fields.len() < 4 {
        if !line.trim().is_empty() {
            tracing::debug!(line, "skipping unparsable lease line");
        }
        return None;
    }

    let Ok(expires_at) = fields[0].parse::<u64>() else {
        tracing::debug!(line, "skipping lease line with bad expiry");
        return None;
    };

    Some(DhcpLease {
        expires_at,
        mac: fields[1].to_string(),
        address: fields[2].to_string(),
        hostname: star_is_none(fields[3]),
        client_id: fields.get(4).copied().and_then(star_is_none),
    })
}

fn star_is_none(field: &str) -> Option<String> {
    if field == "*" {
        None
    } else {
        Some(field.to_string())
    }
}
