//! Application startup and utilities.
//!
//! This module contains exit codes, tracing setup, and error hints
//! that support the main entry point.

use dnsmasq_admin::settings::SettingsError;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Application exit codes.
pub mod exit_code {
    use std::process::ExitCode;

    /// Success (exit code 0).
    pub const SUCCESS: ExitCode = ExitCode::SUCCESS;

    /// Settings error (exit code 1) - invalid args, bad settings file, etc.
    pub const SETTINGS_ERROR: ExitCode = ExitCode::FAILURE;

    /// Runtime error (exit code 2) - I/O failure, corrupt managed file, etc.
    ///
    /// Note: a function rather than a constant because `ExitCode::from()` is not `const fn`.
    pub fn runtime_error() -> ExitCode {
        ExitCode::from(2)
    }
}

/// Prints helpful hints for common settings errors.
pub fn print_settings_hint(error: &SettingsError) {
    match error {
        SettingsError::FileRead { .. } => {
            eprintln!("\nRun 'dnsmasq-admin init' to generate a settings template.");
        }
        SettingsError::InvalidManagedFileName { .. } => {
            eprintln!(
                "\nPick a plain file name that sorts last in the conf-dir, e.g. 'zz-dnsmasq-admin.conf'."
            );
        }
        _ => {}
    }
}

/// Sets up the tracing subscriber for logging.
pub fn setup_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
