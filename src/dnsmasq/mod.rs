//! dnsmasq configuration model.
//!
//! This module provides:
//! - Directive tokenization ([`Directive`], [`parse_directive`])
//! - The managed-file line model ([`ConfigLine`], [`LineKind`])
//! - DHCP reservation parsing ([`DhcpHostEntry`])
//! - The option registry ([`DnsmasqOption`], [`MergeKind`])
//! - Config-set discovery ([`ConfigSet`], [`resolve_config_set`])
//! - The effective-config merge engine ([`EffectiveConfig`], [`merge`])
//!
//! # Merge semantics
//!
//! dnsmasq reads its configuration from an ordered set of files (the main
//! file plus `conf-file`/`conf-dir` includes) and applies one of three
//! rules per option: a *flag* is on if it appears anywhere, a *last-wins*
//! scalar takes its final occurrence, and a *cumulative* option collects
//! every occurrence in read order. The merge engine reproduces those
//! rules and records, for every resulting value, the file and line that
//! produced it.

mod dhcp_host;
mod directive;
mod error;
mod line;
mod merge;
mod options;
mod resolver;

#[cfg(test)]
#[path = "dhcp_host_tests.rs"]
mod dhcp_host_tests;
#[cfg(test)]
#[path = "resolver_tests.rs"]
mod resolver_tests;

pub use dhcp_host::{DhcpHostEntry, IdAllocator, collect_dhcp_hosts};
pub use directive::{Directive, DirectiveError, parse_directive, split_comment};
pub use error::ConfError;
pub use line::{ConfigLine, LineKind, parse_file, renumber, to_line};
pub use merge::{
    EffectiveConfig, EffectiveSources, LoadedFile, SourcedValue, ValueSource, merge,
};
pub use options::{DnsmasqOption, MergeKind};
pub use resolver::{
    ConfigSet, ConfigSetEntry, IncludeSource, ensure_managed_include, resolve_config_set,
};
