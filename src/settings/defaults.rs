//! Default values for settings.
//!
//! Centralized constants to avoid magic numbers scattered across the
//! codebase.

use std::time::Duration;

/// Default main dnsmasq configuration file.
pub const MAIN_CONFIG: &str = "/etc/dnsmasq.conf";

/// Default name of the managed file inside the `conf-dir` directory.
///
/// The `zz-` prefix makes it sort last, so it is read after the other
/// members and wins last-wins conflicts.
pub const MANAGED_FILE: &str = "zz-dnsmasq-admin.conf";

/// Default app-writable hosts file advertised via `addn-hosts=`.
pub const HOSTS_FILE: &str = "/etc/dnsmasq-admin.hosts";

/// Default snapshot staleness threshold in seconds.
pub const STALENESS_SECS: u64 = 120;

/// Default self-write suppression window in milliseconds.
pub const SUPPRESSION_WINDOW_MS: u64 = 1500;

/// Default watcher poll interval in seconds.
pub const WATCH_INTERVAL_SECS: u64 = 2;

/// Default staleness threshold as a Duration.
#[must_use]
pub const fn staleness() -> Duration {
    Duration::from_secs(STALENESS_SECS)
}

/// Default suppression window as a Duration.
#[must_use]
pub const fn suppression_window() -> Duration {
    Duration::from_millis(SUPPRESSION_WINDOW_MS)
}

/// Default watcher poll interval as a Duration.
#[must_use]
pub const fn watch_interval() -> Duration {
    Duration::from_secs(WATCH_INTERVAL_SECS)
}
