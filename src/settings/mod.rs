//! Settings layer for dnsmasq-admin.
//!
//! This module provides:
//! - CLI argument parsing ([`Cli`], [`Command`])
//! - TOML settings file parsing ([`TomlSettings`])
//! - Validated settings ([`ValidatedSettings`])
//! - Settings file generation ([`write_default_settings`])
//! - Default values ([`defaults`])
//!
//! # Priority
//!
//! Values are resolved with the following priority (highest first):
//!
//! 1. **Explicit CLI arguments**
//! 2. **TOML settings file** (`--config <path>`)
//! 3. **Built-in defaults**
//!
//! Every field has a default, so the tool runs with no configuration at
//! all against `/etc/dnsmasq.conf`.

mod cli;
pub mod defaults;
mod error;
mod toml;
mod validated;


pub use cli::{Cli, Command};
pub use error::SettingsError;
pub use toml::{TomlSettings, default_settings_template};
pub use validated::{ValidatedSettings, write_default_settings};
