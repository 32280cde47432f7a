//! CLI argument parsing using clap.
//!
//! Defines the command-line interface with all options and subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// dnsmasq-admin: administrative tool for a dnsmasq server
///
/// Discovers the effective configuration set, merges option values with
/// dnsmasq's per-option semantics, and edits the single managed file.
#[derive(Debug, Parser)]
#[command(name = "dnsmasq-admin")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to a settings file
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Main dnsmasq configuration file
    #[arg(long = "main-config")]
    pub main_config: Option<PathBuf>,

    /// Name of the managed file inside the conf-dir directory
    #[arg(long = "managed-file", value_name = "NAME")]
    pub managed_file: Option<String>,

    /// App-writable hosts file advertised via addn-hosts
    #[arg(long = "hosts-file")]
    pub hosts_file: Option<PathBuf>,

    /// Snapshot staleness threshold in seconds
    #[arg(long)]
    pub staleness: Option<u64>,

    /// Self-write suppression window in milliseconds
    #[arg(long = "suppression-window", value_name = "MS")]
    pub suppression_window: Option<u64>,

    /// Watcher poll interval in seconds
    #[arg(long = "watch-interval")]
    pub watch_interval: Option<u64>,

    /// Enable verbose logging
    #[arg(long, short)]
    pub verbose: bool,
}

/// Subcommands for dnsmasq-admin
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a default settings file
    Init {
        /// Output path for the settings file
        #[arg(long, short, default_value = "dnsmasq-admin.toml")]
        output: PathBuf,
    },

    /// Show the effective merged configuration
    Show {
        /// Include the file/line source of every value
        #[arg(long)]
        sources: bool,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List the files of the configuration set in read order
    Files {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List DHCP reservations from the managed file
    Hosts {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List active DHCP leases
    Leases {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Parse the managed file and report the first syntax problem
    Check,

    /// Watch the config set and log refreshes until interrupted
    Watch,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Parses CLI arguments from an iterator (useful for testing).
    pub fn parse_from_iter<I, T>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::parse_from(iter)
    }
}
