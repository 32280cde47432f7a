//! Write services and read-only viewers.
//!
//! This module provides:
//! - The managed-config editor ([`ManagedConfigService`]) — the only
//!   writer of the managed file
//! - The app-writable hosts file editor ([`HostsFileService`])
//! - The read-only lease viewer ([`DhcpLease`], [`read_leases`])
//! - The reload seam ([`ReloadTrigger`])

mod hosts;
mod leases;
mod managed;
mod reload;

#[cfg(test)]
#[path = "managed_tests.rs"]
mod managed_tests;

pub use hosts::{HostsEntry, HostsFileService};
pub use leases::{DhcpLease, lease_file_path, read_leases};
pub use managed::{ChangeValue, ManagedConfig, ManagedConfigService, OptionChange};
pub use reload::{LogOnlyReload, ReloadError, ReloadOutcome, ReloadTrigger};

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::dnsmasq::ConfError;

/// Error type for service operations.
///
/// Client-actionable conditions (`NotConfigured`, validation failures)
/// are distinct variants so an HTTP boundary can map them to 4xx while
/// I/O failures stay 5xx.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No managed file path is resolvable: the main config has no
    /// usable `conf-dir`. Reads degrade to empty; writes fail with this.
    #[error("no managed config path is resolvable; the main config needs a conf-dir")]
    NotConfigured,

    /// A MAC in the incoming reservations is already reserved in a file
    /// this tool does not manage.
    #[error("MAC address {mac} is already reserved in '{file}'")]
    MacConflict {
        /// The conflicting MAC address.
        mac: String,
        /// Name of the file holding the conflicting reservation.
        file: String,
    },

    /// The incoming request is malformed.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Reading or resolving the config set failed.
    #[error(transparent)]
    Conf(#[from] ConfError),

    /// A write this tool owns failed.
    #[error("failed to write '{}': {source}", path.display())]
    Io {
        /// The file that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ServiceError {
    /// True for conditions the caller can fix (4xx-class), false for
    /// server-side failures.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotConfigured | Self::MacConflict { .. } | Self::Validation(_)
        )
    }
}

/// Writes `content` to `path` atomically: temp file, then rename.
///
/// A reader never observes a half-written file, and a failure (or a
/// dropped future) between the two steps leaves the original intact.
pub(crate) async fn write_atomic(path: &Path, content: String) -> Result<(), ServiceError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || write_atomic_blocking(&path, &content))
        .await
        .expect("atomic write task panicked")
}

fn write_atomic_blocking(path: &Path, content: &str) -> Result<(), ServiceError> {
    let io = |source| ServiceError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(io)?;
        }
    }

    // `.tmp` is appended, not substituted, so `a.conf` and `a.json`
    // cannot collide on the same temp name.
    let temp = PathBuf::from(format!("{}.tmp", path.display()));
    std::fs::write(&temp, content).map_err(io)?;
    std::fs::rename(&temp, path).map_err(io)
}

/// Creates `path` as an empty file (with parent directories) when it
/// does not exist yet.
pub(crate) async fn ensure_file_exists(path: &Path) -> Result<(), ServiceError> {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Ok(());
    }

    let io = |source| ServiceError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(io)?;
        }
    }
    tokio::fs::write(path, "").await.map_err(io)
}
