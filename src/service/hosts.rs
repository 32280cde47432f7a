//! Editor for the app-writable hosts file.
//!
//! The managed config always advertises one `addn-hosts=` file to
//! dnsmasq; this service owns that file. Reads tolerate foreign
//! content (comments and odd lines are skipped), writes replace the
//! whole file atomically. `/etc/hosts` and any other `addn-hosts`
//! members are never touched.

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dnsmasq::split_comment;

use super::{ServiceError, ensure_file_exists, write_atomic};

/// One hosts-file mapping: an address and its names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostsEntry {
    /// IPv4 or IPv6 address, textual.
    pub address: String,
    /// Hostnames for the address, first one canonical.
    pub hostnames: Vec<String>,
    /// Trailing comment, without the `#`.
    #[serde(default)]
    pub comment: Option<String>,
}

/// Reads and rewrites the app-writable hosts file.
#[derive(Debug, Clone)]
pub struct HostsFileService {
    path: PathBuf,
}

impl HostsFileService {
    /// Creates a service for the given hosts file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file this service owns.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the current entries. A missing file reads as empty;
    /// comment lines and lines without an address+name pair are
    /// skipped, not errors.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors other than the file not existing.
    pub async fn read_entries(&self) -> Result<Vec<HostsEntry>, ServiceError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(ServiceError::Conf(crate::dnsmasq::ConfError::Read {
                    path: self.path.clone(),
                    source,
                }));
            }
        };

        Ok(content.lines().filter_map(parse_hosts_line).collect())
    }

    /// Replaces the whole file with the given entries, atomically.
    ///
    /// # Errors
    ///
    /// Returns a validation error for entries with an unparsable
    /// address or no hostname, and an I/O error when the write fails.
    pub async fn write_entries(&self, entries: &[HostsEntry]) -> Result<(), ServiceError> {
        let mut content = String::new();
        for entry in entries {
            if entry.address.parse::<IpAddr>().is_err() {
                return Err(ServiceError::Validation(format!(
                    "'{}' is not an IP address",
                    entry.address
                )));
            }
            if entry.hostnames.is_empty() || entry.hostnames.iter().any(|h| h.trim().is_empty()) {
                return Err(ServiceError::Validation(format!(
                    "entry for {} needs at least one non-empty hostname",
                    entry.address
                )));
            }

            content.push_str(&entry.address);
            for hostname in &entry.hostnames {
                content.push(' ');
                content.push_str(hostname);
            }
            if let Some(comment) = &entry.comment {
                content.push_str(" # ");
                content.push_str(comment);
            }
            content.push('\n');
        }

        write_atomic(&self.path, content).await
    }

    /// Creates the file empty when missing, so dnsmasq can start even
    /// before the first entry is written.
    ///
    /// # Errors
    ///
    /// Fails when the file (or a parent directory) cannot be created.
    pub async fn ensure_exists(&self) -> Result<(), ServiceError> {
        ensure_file_exists(&self.path).await
    }
}

fn parse_hosts_line(line: &str) -> Option<HostsEntry> {
    let (content, comment) = split_comment(line);

    let mut fields = content.split_whitespace();
    let address = fields.next()?.to_string();
    let hostnames: Vec<String> = fields.map(ToString::to_string).collect();

    if address.parse::<IpAddr>().is_err() || hostnames.is_empty() {
        return None;
    }

    Some(HostsEntry {
        address,
        hostnames,
        comment: comment.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
    })
}
