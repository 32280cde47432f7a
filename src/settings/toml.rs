//! TOML settings file parsing.
//!
//! Defines the structure of the settings file with serde.

use std::path::Path;

use serde::Deserialize;

use super::SettingsError;

/// Root settings structure from the TOML file.
///
/// All fields are optional so a partial file merges cleanly with CLI
/// arguments and defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlSettings {
    /// dnsmasq file locations
    #[serde(default)]
    pub dnsmasq: DnsmasqSection,

    /// Snapshot cache tuning
    #[serde(default)]
    pub cache: CacheSection,

    /// File watcher tuning
    #[serde(default)]
    pub watch: WatchSection,
}

/// dnsmasq file locations.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DnsmasqSection {
    /// Main dnsmasq configuration file
    pub main_config: Option<String>,

    /// Name of the managed file inside the conf-dir directory
    pub managed_file: Option<String>,

    /// App-writable hosts file advertised via addn-hosts
    pub hosts_file: Option<String>,
}

/// Snapshot cache tuning.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    /// Staleness threshold in seconds
    pub staleness: Option<u64>,

    /// Self-write suppression window in milliseconds
    pub suppression_window: Option<u64>,
}

/// File watcher tuning.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    /// Poll interval in seconds
    pub poll_interval: Option<u64>,
}

impl TomlSettings {
    /// Loads settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|e| SettingsError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content)
    }

    /// Parses settings from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, SettingsError> {
        toml::from_str(content).map_err(SettingsError::from)
    }
}

/// Generates a default settings file with comments.
#[must_use]
pub fn default_settings_template() -> String {
    r"# dnsmasq-admin settings file

[dnsmasq]
# Main dnsmasq configuration file (default: /etc/dnsmasq.conf)
# main_config = '/etc/dnsmasq.conf'

# Name of the managed file, created inside the directory referenced by
# the main config's conf-dir. The zz- prefix keeps it sorting last so
# its settings win last-wins conflicts.
# managed_file = 'zz-dnsmasq-admin.conf'

# App-writable hosts file; every managed write advertises this path to
# dnsmasq via a single addn-hosts line.
# hosts_file = '/etc/dnsmasq-admin.hosts'

[cache]
# How long a clean snapshot is served without re-reading, in seconds
# (default: 120)
# staleness = 120

# How long after our own write a watcher event for the managed file is
# ignored, in milliseconds (default: 1500)
# suppression_window = 1500

[watch]
# Watcher poll interval in seconds (default: 2)
# poll_interval = 2
"
    .to_string()
}
