//! Effective-config merge engine.
//!
//! A pure, deterministic fold over the config set: files in set order,
//! lines in file order. Two merges of the same input produce identical
//! values and identical source attribution.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use super::directive::parse_directive;
use super::options::{DnsmasqOption, MergeKind};
use super::resolver::{ConfigSetEntry, strip_bom};

/// The file and line that produced an effective value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueSource {
    /// Full path of the contributing file.
    pub path: PathBuf,
    /// File name, for display.
    pub file_name: String,
    /// Whether the contributing file is the managed file.
    pub is_managed: bool,
    /// 1-based line within the file.
    pub line_number: usize,
}

impl ValueSource {
    /// A value can only be edited through this tool when its source is
    /// the managed file.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        !self.is_managed
    }
}

/// One contribution to a cumulative option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourcedValue {
    /// The raw option value.
    pub value: String,
    /// Where it came from.
    pub source: ValueSource,
}

/// One file of the config set with its content, ready to merge.
#[derive(Debug, Clone)]
pub struct LoadedFile {
    /// The set entry describing the file.
    pub entry: ConfigSetEntry,
    /// The file's lines, in order.
    pub lines: Vec<String>,
}

impl LoadedFile {
    /// Wraps raw file content for merging (handles a stray BOM).
    #[must_use]
    pub fn from_content(entry: ConfigSetEntry, content: &str) -> Self {
        let lines = strip_bom(content).lines().map(ToString::to_string).collect();
        Self { entry, lines }
    }
}

/// The merged value of every known option across the config set.
///
/// `None` scalars mean "never set" — dnsmasq's built-in default applies
/// and is deliberately not modeled here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EffectiveConfig {
    // Flags.
    /// `no-hosts`: do not read `/etc/hosts`.
    pub no_hosts: bool,
    /// `expand-hosts`: add the local domain to plain names from hosts files.
    pub expand_hosts: bool,
    /// `bogus-priv`: fake reverse lookups for private ranges.
    pub bogus_priv: bool,
    /// `domain-needed`: never forward plain names.
    pub domain_needed: bool,
    /// `no-resolv`: ignore `/etc/resolv.conf`.
    pub no_resolv: bool,
    /// `no-poll`: do not watch `/etc/resolv.conf` for changes.
    pub no_poll: bool,
    /// `log-queries`: log DNS traffic.
    pub log_queries: bool,
    /// `log-dhcp`: log DHCP traffic.
    pub log_dhcp: bool,
    /// `dhcp-authoritative`: claim authority on the subnet.
    pub dhcp_authoritative: bool,
    /// `bind-interfaces`: bind listening sockets per interface.
    pub bind_interfaces: bool,
    /// `stop-dns-rebind`: reject upstream answers in private ranges.
    pub stop_dns_rebind: bool,
    /// `localise-queries`: answer from hosts according to the receiving interface.
    pub localise_queries: bool,

    // Last-wins scalars.
    /// `port`.
    pub port: Option<u16>,
    /// `cache-size`.
    pub cache_size: Option<u32>,
    /// `domain`.
    pub domain: Option<String>,
    /// `local-ttl`.
    pub local_ttl: Option<u32>,
    /// `dhcp-lease-max`.
    pub dhcp_lease_max: Option<u32>,
    /// `dhcp-leasefile`.
    pub dhcp_lease_file: Option<String>,
    /// `resolv-file`.
    pub resolv_file: Option<String>,
    /// `pid-file`.
    pub pid_file: Option<String>,
    /// `user`.
    pub user: Option<String>,
    /// `group`.
    pub group: Option<String>,
    /// `log-facility`.
    pub log_facility: Option<String>,

    // Cumulative lists, in file-then-line order.
    /// `addn-hosts` paths.
    pub addn_hosts: Vec<String>,
    /// `interface` names.
    pub interfaces: Vec<String>,
    /// `except-interface` names.
    pub except_interfaces: Vec<String>,
    /// `listen-address` values.
    pub listen_addresses: Vec<String>,
    /// `server` entries.
    pub servers: Vec<String>,
    /// `local` entries.
    pub locals: Vec<String>,
    /// `address` entries.
    pub addresses: Vec<String>,
    /// `dhcp-range` entries.
    pub dhcp_ranges: Vec<String>,
    /// `dhcp-host` lines, passed through unparsed.
    pub dhcp_hosts: Vec<String>,
    /// `dhcp-option` entries.
    pub dhcp_options: Vec<String>,
    /// `cname` records.
    pub cnames: Vec<String>,
    /// `host-record` entries.
    pub host_records: Vec<String>,
    /// `conf-file` includes (as written).
    pub conf_files: Vec<String>,
    /// `conf-dir` includes (as written).
    pub conf_dirs: Vec<String>,
}

/// Source attribution parallel to [`EffectiveConfig`], keyed by option
/// key: flags and last-wins scalars in `single`, cumulative options in
/// `cumulative` with one source per contribution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EffectiveSources {
    /// Flag and last-wins attribution. A flag keeps the source that
    /// first turned it on; a scalar keeps the last occurrence.
    pub single: BTreeMap<String, ValueSource>,
    /// Cumulative attribution: every contribution with its source.
    pub cumulative: BTreeMap<String, Vec<SourcedValue>>,
}

impl EffectiveSources {
    /// Attribution for a flag or last-wins option.
    #[must_use]
    pub fn single(&self, option: DnsmasqOption) -> Option<&ValueSource> {
        self.single.get(option.key())
    }

    /// Attribution for a cumulative option (empty when never set).
    #[must_use]
    pub fn cumulative(&self, option: DnsmasqOption) -> &[SourcedValue] {
        self.cumulative
            .get(option.key())
            .map_or(&[], Vec::as_slice)
    }
}

/// Merges the loaded config set into effective values with attribution.
///
/// Lines that fail to tokenize and keys the registry does not know are
/// skipped — the merge models known options only.
#[must_use]
pub fn merge(files: &[LoadedFile]) -> (EffectiveConfig, EffectiveSources) {
    let mut config = EffectiveConfig::default();
    let mut sources = EffectiveSources::default();

    for file in files {
        for (i, line) in file.lines.iter().enumerate() {
            let Ok(Some(directive)) = parse_directive(line, i + 1) else {
                continue;
            };
            let Some(option) = DnsmasqOption::from_key(&directive.key) else {
                continue;
            };

            let source = ValueSource {
                path: file.entry.path.clone(),
                file_name: file.entry.file_name.clone(),
                is_managed: file.entry.is_managed,
                line_number: i + 1,
            };

            match option.merge_kind() {
                MergeKind::Flag => {
                    // First-true wins for attribution: later mentions of
                    // an already-set flag do not move the source.
                    if !config.set_flag(option) {
                        sources.single.insert(option.key().to_string(), source);
                    }
                }
                MergeKind::LastWins => {
                    config.set_scalar(option, &directive.value);
                    sources.single.insert(option.key().to_string(), source);
                }
                MergeKind::Cumulative => {
                    config.push_list(option, directive.value.clone());
                    sources
                        .cumulative
                        .entry(option.key().to_string())
                        .or_default()
                        .push(SourcedValue {
                            value: directive.value,
                            source,
                        });
                }
            }
        }
    }

    (config, sources)
}

impl EffectiveConfig {
    /// Sets a flag, returning its previous state.
    fn set_flag(&mut self, option: DnsmasqOption) -> bool {
        use DnsmasqOption as O;
        let slot = match option {
            O::NoHosts => &mut self.no_hosts,
            O::ExpandHosts => &mut self.expand_hosts,
            O::BogusPriv => &mut self.bogus_priv,
            O::DomainNeeded => &mut self.domain_needed,
            O::NoResolv => &mut self.no_resolv,
            O::NoPoll => &mut self.no_poll,
            O::LogQueries => &mut self.log_queries,
            O::LogDhcp => &mut self.log_dhcp,
            O::DhcpAuthoritative => &mut self.dhcp_authoritative,
            O::BindInterfaces => &mut self.bind_interfaces,
            O::StopDnsRebind => &mut self.stop_dns_rebind,
            O::LocaliseQueries => &mut self.localise_queries,
            _ => unreachable!("option {option} is not a flag"),
        };
        std::mem::replace(slot, true)
    }

    /// Overwrites a last-wins scalar. Numeric values that fail to parse
    /// become `None` — malformed input reads as "not set", never a crash.
    fn set_scalar(&mut self, option: DnsmasqOption, value: &str) {
        use DnsmasqOption as O;
        match option {
            O::Port => self.port = value.parse().ok(),
            O::CacheSize => self.cache_size = value.parse().ok(),
            O::LocalTtl => self.local_ttl = value.parse().ok(),
            O::DhcpLeaseMax => self.dhcp_lease_max = value.parse().ok(),
            O::Domain => self.domain = Some(value.to_string()),
            O::DhcpLeaseFile => self.dhcp_lease_file = Some(value.to_string()),
            O::ResolvFile => self.resolv_file = Some(value.to_string()),
            O::PidFile => self.pid_file = Some(value.to_string()),
            O::User => self.user = Some(value.to_string()),
            O::Group => self.group = Some(value.to_string()),
            O::LogFacility => self.log_facility = Some(value.to_string()),
            _ => unreachable!("option {option} is not a last-wins scalar"),
        }
    }

    /// Appends to a cumulative list.
    fn push_list(&mut self, option: DnsmasqOption, value: String) {
        use DnsmasqOption as O;
        let slot = match option {
            O::AddnHosts => &mut self.addn_hosts,
            O::Interface => &mut self.interfaces,
            O::ExceptInterface => &mut self.except_interfaces,
            O::ListenAddress => &mut self.listen_addresses,
            O::Server => &mut self.servers,
            O::Local => &mut self.locals,
            O::Address => &mut self.addresses,
            O::DhcpRange => &mut self.dhcp_ranges,
            O::DhcpHost => &mut self.dhcp_hosts,
            O::DhcpOption => &mut self.dhcp_options,
            O::Cname => &mut self.cnames,
            O::HostRecord => &mut self.host_records,
            O::ConfFile => &mut self.conf_files,
            O::ConfDir => &mut self.conf_dirs,
            _ => unreachable!("option {option} is not cumulative"),
        };
        slot.push(value);
    }
}
