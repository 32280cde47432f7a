//! Line model for the managed configuration file.
//!
//! Every physical line of the managed file is parsed into a
//! [`ConfigLine`] and can be serialized back byte-for-byte. Lines the
//! tool has no structured model for are carried as opaque
//! [`LineKind::Other`] text — the safety valve that keeps hand-edited
//! content intact across a read/modify/write cycle.

use serde::{Deserialize, Serialize};

use super::dhcp_host::DhcpHostEntry;

/// One physical line of the managed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigLine {
    /// 1-based position in the file. Zero for lines created in memory
    /// that have not been written yet.
    #[serde(default)]
    pub number: usize,
    /// What the line is.
    pub kind: LineKind,
}

/// The parsed shape of a line.
///
/// A closed set so every consumer handles all cases exhaustively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LineKind {
    /// An empty (or whitespace-only) line, preserved verbatim.
    Blank {
        /// Original text, including any whitespace.
        #[serde(default)]
        raw: String,
    },
    /// A comment line, preserved verbatim.
    Comment {
        /// Original text including the `#`.
        raw: String,
    },
    /// An `addn-hosts=<path>` directive.
    AddnHosts {
        /// Everything after `addn-hosts=`, verbatim.
        path: String,
    },
    /// A `dhcp-host=` reservation, active or commented out.
    DhcpHost {
        /// The parsed reservation.
        entry: DhcpHostEntry,
    },
    /// Any other line, preserved byte-for-byte.
    Other {
        /// Original text.
        raw: String,
    },
}

impl ConfigLine {
    /// Creates an in-memory line (not yet tied to a file position).
    #[must_use]
    pub const fn new(kind: LineKind) -> Self {
        Self { number: 0, kind }
    }

    /// Creates an `addn-hosts=` line for the given path.
    #[must_use]
    pub fn addn_hosts(path: impl Into<String>) -> Self {
        Self::new(LineKind::AddnHosts { path: path.into() })
    }

    /// Creates an opaque directive line from raw text.
    #[must_use]
    pub fn other(raw: impl Into<String>) -> Self {
        Self::new(LineKind::Other { raw: raw.into() })
    }

    /// Creates a reservation line from an entry.
    #[must_use]
    pub const fn dhcp_host(entry: DhcpHostEntry) -> Self {
        Self::new(LineKind::DhcpHost { entry })
    }
}

/// Parses one raw line.
///
/// Never fails: content that does not match a structured kind degrades
/// to [`LineKind::Other`] (or [`LineKind::Comment`] for comments) so a
/// foreign or hand-edited file never blocks a read.
#[must_use]
pub fn parse_line(raw: &str, number: usize) -> ConfigLine {
    let kind = if raw.trim().is_empty() {
        LineKind::Blank {
            raw: raw.to_string(),
        }
    } else if let Some(value) = raw.strip_prefix("#dhcp-host=") {
        // A disabled reservation. Only the exact `#dhcp-host=` prefix is
        // recognized; anything looser stays an opaque comment so the
        // round-trip stays byte-stable.
        LineKind::DhcpHost {
            entry: DhcpHostEntry::parse_value(value, true),
        }
    } else if raw.trim_start().starts_with('#') {
        LineKind::Comment {
            raw: raw.to_string(),
        }
    } else if let Some(path) = raw.strip_prefix("addn-hosts=") {
        LineKind::AddnHosts {
            path: path.to_string(),
        }
    } else if let Some(value) = raw.strip_prefix("dhcp-host=") {
        LineKind::DhcpHost {
            entry: DhcpHostEntry::parse_value(value, false),
        }
    } else {
        LineKind::Other {
            raw: raw.to_string(),
        }
    };

    ConfigLine { number, kind }
}

/// Parses a whole file into lines, numbering from 1.
#[must_use]
pub fn parse_file<S: AsRef<str>>(lines: &[S]) -> Vec<ConfigLine> {
    lines
        .iter()
        .enumerate()
        .map(|(i, raw)| parse_line(raw.as_ref(), i + 1))
        .collect()
}

/// Renumbers lines sequentially from 1, reflecting the positions they
/// will occupy once written. Ids derived from positions (the `line:N`
/// fallback) stay consistent with the file that lands on disk.
pub fn renumber(lines: &mut [ConfigLine]) {
    for (i, line) in lines.iter_mut().enumerate() {
        line.number = i + 1;
    }
}

/// Serializes one line back to its textual form.
///
/// The exact inverse of [`parse_line`] for all structured kinds, and the
/// identity for `Other`, `Comment` and `Blank`.
#[must_use]
pub fn to_line(line: &ConfigLine) -> String {
    match &line.kind {
        LineKind::Blank { raw } | LineKind::Comment { raw } | LineKind::Other { raw } => raw.clone(),
        LineKind::AddnHosts { path } => format!("addn-hosts={path}"),
        LineKind::DhcpHost { entry } => {
            let prefix = if entry.is_comment { "#" } else { "" };
            format!("{prefix}dhcp-host={}", entry.to_value())
        }
    }
}
