//! Validated settings after merging CLI and TOML sources.
//!
//! All validation happens during construction; the rest of the program
//! only ever sees a [`ValidatedSettings`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::cli::Cli;
use super::defaults;
use super::error::SettingsError;
use super::toml::TomlSettings;

/// Fully validated settings ready for use by the application.
#[derive(Debug)]
pub struct ValidatedSettings {
    /// Main dnsmasq configuration file.
    pub main_config: PathBuf,

    /// Name of the managed file inside the conf-dir directory.
    pub managed_file_name: String,

    /// App-writable hosts file advertised via `addn-hosts=`.
    pub hosts_file: PathBuf,

    /// Snapshot staleness threshold.
    pub staleness: Duration,

    /// Self-write suppression window.
    pub suppression_window: Duration,

    /// Watcher poll interval.
    pub watch_interval: Duration,

    /// Verbose logging enabled.
    pub verbose: bool,
}

impl fmt::Display for ValidatedSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Settings {{ main_config: {}, managed_file: {}, hosts_file: {}, \
             staleness: {}s, suppression: {}ms, watch: {}s }}",
            self.main_config.display(),
            self.managed_file_name,
            self.hosts_file.display(),
            self.staleness.as_secs(),
            self.suppression_window.as_millis(),
            self.watch_interval.as_secs(),
        )
    }
}

impl ValidatedSettings {
    /// Creates validated settings from CLI arguments and an optional
    /// TOML file, CLI taking precedence.
    ///
    /// # Errors
    ///
    /// Returns an error when the managed file name is unusable or a
    /// duration is zero.
    pub fn from_raw(cli: &Cli, toml: Option<&TomlSettings>) -> Result<Self, SettingsError> {
        let main_config = cli
            .main_config
            .clone()
            .or_else(|| toml.and_then(|t| t.dnsmasq.main_config.as_deref().map(expand_tilde)))
            .unwrap_or_else(|| PathBuf::from(defaults::MAIN_CONFIG));

        let managed_file_name = cli
            .managed_file
            .clone()
            .or_else(|| toml.and_then(|t| t.dnsmasq.managed_file.clone()))
            .unwrap_or_else(|| defaults::MANAGED_FILE.to_string());
        validate_managed_file_name(&managed_file_name)?;

        let hosts_file = cli
            .hosts_file
            .clone()
            .or_else(|| toml.and_then(|t| t.dnsmasq.hosts_file.as_deref().map(expand_tilde)))
            .unwrap_or_else(|| PathBuf::from(defaults::HOSTS_FILE));

        let staleness = resolve_duration(
            "cache.staleness",
            cli.staleness
                .or_else(|| toml.and_then(|t| t.cache.staleness)),
            defaults::staleness(),
            Duration::from_secs,
        )?;

        let suppression_window = resolve_duration(
            "cache.suppression_window",
            cli.suppression_window
                .or_else(|| toml.and_then(|t| t.cache.suppression_window)),
            defaults::suppression_window(),
            Duration::from_millis,
        )?;

        let watch_interval = resolve_duration(
            "watch.poll_interval",
            cli.watch_interval
                .or_else(|| toml.and_then(|t| t.watch.poll_interval)),
            defaults::watch_interval(),
            Duration::from_secs,
        )?;

        Ok(Self {
            main_config,
            managed_file_name,
            hosts_file,
            staleness,
            suppression_window,
            watch_interval,
            verbose: cli.verbose,
        })
    }

    /// Loads and merges settings from CLI and an optional settings file.
    ///
    /// # Errors
    ///
    /// Returns an error when the settings file cannot be read or parsed,
    /// or the merged settings are invalid.
    pub fn load(cli: &Cli) -> Result<Self, SettingsError> {
        let toml = if let Some(ref path) = cli.config {
            Some(TomlSettings::load(path)?)
        } else {
            None
        };

        Self::from_raw(cli, toml.as_ref())
    }
}

/// Writes the default settings template to a file.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_default_settings(path: &Path) -> Result<(), SettingsError> {
    let template = super::toml::default_settings_template();
    std::fs::write(path, template).map_err(|e| SettingsError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

// Helper functions

fn validate_managed_file_name(name: &str) -> Result<(), SettingsError> {
    let invalid = |reason| SettingsError::InvalidManagedFileName {
        name: name.to_string(),
        reason,
    };

    if name.trim().is_empty() {
        return Err(invalid("must not be empty"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(invalid("must be a bare file name, not a path"));
    }
    if name.starts_with('.') || name.ends_with('~') {
        return Err(invalid("dnsmasq skips hidden and backup-style names"));
    }
    Ok(())
}

fn resolve_duration(
    field: &'static str,
    explicit: Option<u64>,
    default: Duration,
    from: fn(u64) -> Duration,
) -> Result<Duration, SettingsError> {
    match explicit {
        None => Ok(default),
        Some(0) => Err(SettingsError::InvalidDuration {
            field,
            reason: "must be greater than 0",
        }),
        Some(value) => Ok(from(value)),
    }
}

/// Expands a leading `~/` against the user's home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
