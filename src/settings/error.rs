//! Error types for settings parsing and validation.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for settings operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failed to read the settings file.
    #[error("failed to read settings file '{}': {source}", path.display())]
    FileRead {
        /// Path to the settings file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the TOML settings.
    #[error("failed to parse settings: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to write the settings file (for the init command).
    #[error("failed to write settings file '{}': {source}", path.display())]
    FileWrite {
        /// Path to the settings file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The managed file name cannot be used.
    #[error("invalid managed file name '{name}': {reason}")]
    InvalidManagedFileName {
        /// The offending name.
        name: String,
        /// Why it is rejected.
        reason: &'static str,
    },

    /// A duration setting is out of range.
    #[error("invalid value for {field}: {reason}")]
    InvalidDuration {
        /// Name of the setting.
        field: &'static str,
        /// Why it is rejected.
        reason: &'static str,
    },
}
