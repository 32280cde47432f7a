//! Config-set discovery.
//!
//! Starting from the main configuration file, follows `conf-file=` and
//! `conf-dir=` directives to build the ordered list of files dnsmasq
//! would read. Only the main file is scanned for includes — dnsmasq's
//! own includes are not recursive in practice.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::directive::parse_directive;
use super::error::ConfError;
use super::options::DnsmasqOption;

/// How a file entered the config set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IncludeSource {
    /// The main configuration file itself.
    Main,
    /// Referenced by a `conf-file=` directive.
    ConfFile,
    /// Enumerated from a `conf-dir=` directory.
    ConfDir,
}

/// One file in the effective configuration set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigSetEntry {
    /// Full path to the file.
    pub path: PathBuf,
    /// File name component, for display.
    pub file_name: String,
    /// How the file entered the set.
    pub source: IncludeSource,
    /// True for the single file this tool may modify.
    pub is_managed: bool,
}

/// The ordered set of configuration files in effect.
///
/// Ordering reflects dnsmasq's read order: files appear where their
/// include directive is encountered, and `conf-dir` members are sorted
/// by name. A path reachable twice keeps only its last position — the
/// occurrence that decides last-wins precedence.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSet {
    /// Files in read order.
    pub entries: Vec<ConfigSetEntry>,
    /// The main configuration file the set was resolved from.
    pub main_config_path: PathBuf,
    /// Where the managed file lives (inside the first usable
    /// `conf-dir`), or `None` when no `conf-dir` is configured and
    /// writes must fail.
    pub managed_file_path: Option<PathBuf>,
}

impl ConfigSet {
    /// The managed entry, when the managed file is part of the set.
    #[must_use]
    pub fn managed_entry(&self) -> Option<&ConfigSetEntry> {
        self.entries.iter().find(|e| e.is_managed)
    }

    /// All entries except the managed file (read-only inputs).
    pub fn unmanaged_entries(&self) -> impl Iterator<Item = &ConfigSetEntry> {
        self.entries.iter().filter(|e| !e.is_managed)
    }
}

/// Resolves the config set reachable from `main_config`.
///
/// `managed_file_name` is the fixed name of the file this tool owns; it
/// is expected to live in the first usable `conf-dir` directory.
///
/// # Errors
///
/// Fails only when the main file cannot be read. Unreadable include
/// directories are skipped with a warning, and include syntax errors on
/// individual lines are ignored (dnsmasq itself would reject the file,
/// but a half-broken main config should not take this tool down).
pub async fn resolve_config_set(
    main_config: &Path,
    managed_file_name: &str,
) -> Result<ConfigSet, ConfError> {
    let content = tokio::fs::read_to_string(main_config)
        .await
        .map_err(|source| ConfError::Read {
            path: main_config.to_path_buf(),
            source,
        })?;

    let main_dir = main_config.parent().map_or_else(PathBuf::new, Path::to_path_buf);

    let mut entries = vec![entry(main_config.to_path_buf(), IncludeSource::Main)];
    let mut managed_file_path = None;

    for (i, line) in strip_bom(&content).lines().enumerate() {
        let Ok(Some(directive)) = parse_directive(line, i + 1) else {
            continue;
        };
        match DnsmasqOption::from_key(&directive.key) {
            Some(DnsmasqOption::ConfFile) if !directive.value.is_empty() => {
                let path = resolve_path(&main_dir, &directive.value);
                entries.push(entry(path, IncludeSource::ConfFile));
            }
            Some(DnsmasqOption::ConfDir) if !directive.value.is_empty() => {
                let (dir, filters) = split_dir_filters(&directive.value);
                let dir = resolve_path(&main_dir, &dir);

                if managed_file_path.is_none() && dir.is_dir() {
                    managed_file_path = Some(dir.join(managed_file_name));
                }

                match list_conf_dir(&dir, &filters).await {
                    Ok(names) => {
                        for name in names {
                            entries.push(entry(dir.join(name), IncludeSource::ConfDir));
                        }
                    }
                    Err(source) => {
                        tracing::warn!(dir = %dir.display(), error = %source, "skipping unreadable conf-dir");
                    }
                }
            }
            _ => {}
        }
    }

    let entries = dedupe_keep_last(entries);
    let mut set = ConfigSet {
        entries,
        main_config_path: main_config.to_path_buf(),
        managed_file_path,
    };

    if let Some(managed) = set.managed_file_path.clone() {
        for e in &mut set.entries {
            e.is_managed = e.path == managed;
        }
    }

    Ok(set)
}

/// Makes sure the main config loads the managed file last.
///
/// Appends a `conf-file=<managed path>` line at the end of the main
/// file when no such line exists yet, so the managed file is read after
/// everything else and wins last-wins conflicts. Returns whether the
/// main file was modified. This is the only mutation of the main config
/// this tool ever performs.
///
/// # Errors
///
/// Fails when the main file cannot be read or rewritten.
pub async fn ensure_managed_include(
    main_config: &Path,
    managed_path: &Path,
) -> Result<bool, ConfError> {
    let content = tokio::fs::read_to_string(main_config)
        .await
        .map_err(|source| ConfError::Read {
            path: main_config.to_path_buf(),
            source,
        })?;

    let wanted = managed_path.to_string_lossy();
    for (i, line) in strip_bom(&content).lines().enumerate() {
        if let Ok(Some(d)) = parse_directive(line, i + 1) {
            if DnsmasqOption::from_key(&d.key) == Some(DnsmasqOption::ConfFile)
                && d.value == wanted
            {
                return Ok(false);
            }
        }
    }

    let mut updated = content;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(&format!("conf-file={wanted}\n"));

    tokio::fs::write(main_config, updated)
        .await
        .map_err(|source| ConfError::Write {
            path: main_config.to_path_buf(),
            source,
        })?;

    tracing::info!(
        main_config = %main_config.display(),
        managed = %managed_path.display(),
        "registered managed file in main config"
    );
    Ok(true)
}

fn entry(path: PathBuf, source: IncludeSource) -> ConfigSetEntry {
    let file_name = path
        .file_name()
        .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
    ConfigSetEntry {
        path,
        file_name,
        source,
        is_managed: false,
    }
}

fn resolve_path(main_dir: &Path, value: &str) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_absolute() {
        path
    } else {
        main_dir.join(path)
    }
}

/// Splits a `conf-dir` value into the directory and its extension filters.
fn split_dir_filters(value: &str) -> (String, Vec<String>) {
    let mut parts = value.split(',').map(str::trim);
    let dir = parts.next().unwrap_or("").to_string();
    let filters = parts
        .filter(|p| !p.is_empty())
        .map(ToString::to_string)
        .collect();
    (dir, filters)
}

/// Lists a `conf-dir` directory the way dnsmasq does.
///
/// Names ending in `~`, starting with `.`, or wrapped in `#...#` are
/// always skipped. Filters starting with `*` form a whitelist of
/// required suffixes; plain filters exclude matching suffixes. Members
/// are returned sorted by name, which is the read order assumed for
/// last-wins precedence.
async fn list_conf_dir(dir: &Path, filters: &[String]) -> std::io::Result<Vec<String>> {
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();

    while let Some(dir_entry) = read_dir.next_entry().await? {
        let file_type = dir_entry.file_type().await?;
        if file_type.is_dir() {
            continue;
        }
        let name = dir_entry.file_name().to_string_lossy().into_owned();
        if keep_conf_dir_member(&name, filters) {
            names.push(name);
        }
    }

    names.sort();
    Ok(names)
}

fn keep_conf_dir_member(name: &str, filters: &[String]) -> bool {
    if name.ends_with('~')
        || name.starts_with('.')
        || (name.starts_with('#') && name.ends_with('#'))
    {
        return false;
    }

    let whitelist: Vec<&str> = filters
        .iter()
        .filter_map(|f| f.strip_prefix('*'))
        .collect();
    if !whitelist.is_empty() {
        return whitelist.iter().any(|suffix| name.ends_with(suffix));
    }

    !filters.iter().any(|suffix| name.ends_with(suffix.as_str()))
}

fn dedupe_keep_last(entries: Vec<ConfigSetEntry>) -> Vec<ConfigSetEntry> {
    let mut kept = Vec::with_capacity(entries.len());
    for (i, e) in entries.iter().enumerate() {
        let later = entries[i + 1..].iter().any(|other| other.path == e.path);
        if !later {
            kept.push(e.clone());
        }
    }
    kept
}

pub(super) fn strip_bom(content: &str) -> &str {
    content.strip_prefix('\u{feff}').unwrap_or(content)
}
