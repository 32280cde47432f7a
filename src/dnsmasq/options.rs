//! Static registry of dnsmasq options the merge engine models.
//!
//! A plain enum-keyed table: each known option maps to the merge rule
//! dnsmasq applies to repeated occurrences. Unknown keys are ignored by
//! the merge and survive only as opaque lines in the managed file.

use serde::Serialize;
use std::fmt;

/// How repeated occurrences of an option combine across the config set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeKind {
    /// On if the key appears anywhere, with or without a value.
    Flag,
    /// The final occurrence in read order determines the value.
    LastWins,
    /// Every occurrence contributes, in read order, no dedup.
    Cumulative,
}

macro_rules! options {
    ($( $variant:ident => ($key:literal, $kind:ident) ),+ $(,)?) => {
        /// A dnsmasq option known to the merge engine.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum DnsmasqOption {
            $(
                #[doc = concat!("`", $key, "`")]
                $variant,
            )+
        }

        impl DnsmasqOption {
            /// Looks up an option by its configuration key.
            #[must_use]
            pub fn from_key(key: &str) -> Option<Self> {
                match key {
                    $( $key => Some(Self::$variant), )+
                    _ => None,
                }
            }

            /// The option's configuration key.
            #[must_use]
            pub const fn key(self) -> &'static str {
                match self {
                    $( Self::$variant => $key, )+
                }
            }

            /// The merge rule for repeated occurrences.
            #[must_use]
            pub const fn merge_kind(self) -> MergeKind {
                match self {
                    $( Self::$variant => MergeKind::$kind, )+
                }
            }
        }
    };
}

options! {
    // Flags: on if present anywhere.
    NoHosts => ("no-hosts", Flag),
    ExpandHosts => ("expand-hosts", Flag),
    BogusPriv => ("bogus-priv", Flag),
    DomainNeeded => ("domain-needed", Flag),
    NoResolv => ("no-resolv", Flag),
    NoPoll => ("no-poll", Flag),
    LogQueries => ("log-queries", Flag),
    LogDhcp => ("log-dhcp", Flag),
    DhcpAuthoritative => ("dhcp-authoritative", Flag),
    BindInterfaces => ("bind-interfaces", Flag),
    StopDnsRebind => ("stop-dns-rebind", Flag),
    LocaliseQueries => ("localise-queries", Flag),

    // Last-wins scalars.
    Port => ("port", LastWins),
    CacheSize => ("cache-size", LastWins),
    Domain => ("domain", LastWins),
    LocalTtl => ("local-ttl", LastWins),
    DhcpLeaseMax => ("dhcp-lease-max", LastWins),
    DhcpLeaseFile => ("dhcp-leasefile", LastWins),
    ResolvFile => ("resolv-file", LastWins),
    PidFile => ("pid-file", LastWins),
    User => ("user", LastWins),
    Group => ("group", LastWins),
    LogFacility => ("log-facility", LastWins),

    // Cumulative lists.
    AddnHosts => ("addn-hosts", Cumulative),
    Interface => ("interface", Cumulative),
    ExceptInterface => ("except-interface", Cumulative),
    ListenAddress => ("listen-address", Cumulative),
    Server => ("server", Cumulative),
    Local => ("local", Cumulative),
    Address => ("address", Cumulative),
    DhcpRange => ("dhcp-range", Cumulative),
    DhcpHost => ("dhcp-host", Cumulative),
    DhcpOption => ("dhcp-option", Cumulative),
    Cname => ("cname", Cumulative),
    HostRecord => ("host-record", Cumulative),
    ConfFile => ("conf-file", Cumulative),
    ConfDir => ("conf-dir", Cumulative),
}

impl fmt::Display for DnsmasqOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
