//! Reload seam.
//!
//! After a successful managed-file write the service asks dnsmasq to
//! pick up the change. Process invocation lives behind this trait; the
//! write itself never depends on the reload result.

use serde::Serialize;
use thiserror::Error;

/// Error type for reload attempts.
#[derive(Debug, Error)]
pub enum ReloadError {
    /// The reload mechanism reported a failure.
    #[error("reload failed: {0}")]
    Failed(String),
}

/// What happened to the post-write reload, reported back to the caller
/// alongside a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReloadOutcome {
    /// The reload was triggered successfully.
    Completed,
    /// The reload failed; the write itself still succeeded.
    Failed {
        /// Why.
        message: String,
    },
}

/// Triggers a dnsmasq reload after configuration changes.
pub trait ReloadTrigger: Send + Sync {
    /// Asks dnsmasq to re-read its configuration.
    fn reload(&self) -> impl Future<Output = Result<(), ReloadError>> + Send;
}

/// Default trigger: records the request in the log and succeeds.
///
/// Hosts that wire a real `SIGHUP`/service-restart integration provide
/// their own [`ReloadTrigger`] instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOnlyReload;

impl ReloadTrigger for LogOnlyReload {
    async fn reload(&self) -> Result<(), ReloadError> {
        tracing::info!("dnsmasq reload requested");
        Ok(())
    }
}
