//! Managed-config read/modify/write service.
//!
//! The single writer of the managed file. Reads come from the cache;
//! every write re-serializes the full structured line list and lands
//! through an atomic temp-then-rename, so dnsmasq never sees a
//! half-written file. After a write the cache is patched in place and
//! a reload is fired without gating the write's success.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::ConfigCache;
use crate::dnsmasq::{
    ConfError, ConfigLine, ConfigSet, DhcpHostEntry, DnsmasqOption, LineKind, MergeKind,
    collect_dhcp_hosts, ensure_managed_include, parse_file, renumber, to_line,
};

use super::reload::{LogOnlyReload, ReloadOutcome, ReloadTrigger};
use super::{ServiceError, ensure_file_exists, write_atomic};

/// The managed file's structured content, as served to editors.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ManagedConfig {
    /// All lines, in file order. Empty when no managed path resolves.
    pub lines: Vec<ConfigLine>,
    /// The path the file's `addn-hosts=` line currently advertises.
    pub addn_hosts_path: Option<String>,
}

/// One pending edit for the generic option editor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionChange {
    /// The option key, e.g. `cache-size`.
    pub key: String,
    /// The new value, shaped by the option's merge kind.
    pub value: ChangeValue,
}

/// The value side of an [`OptionChange`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeValue {
    /// For flag options. `false` removes the line — dnsmasq flags have
    /// no "off" syntax.
    Flag {
        /// Whether the flag should be present.
        enabled: bool,
    },
    /// For last-wins scalars. `None` removes the setting.
    Scalar {
        /// The new value.
        value: Option<String>,
    },
    /// For cumulative options: the full replacement list.
    List {
        /// One line is written per value.
        values: Vec<String>,
    },
}

/// The only component allowed to mutate the managed file (and, for the
/// include registration, the main config's trailing `conf-file=` line).
#[derive(Debug)]
pub struct ManagedConfigService<R = LogOnlyReload> {
    cache: Arc<ConfigCache>,
    hosts_path: PathBuf,
    reload: R,
}

impl ManagedConfigService<LogOnlyReload> {
    /// Creates a service with the default log-only reload trigger.
    ///
    /// `hosts_path` is the app-writable hosts file every write
    /// advertises via the enforced `addn-hosts=` line.
    #[must_use]
    pub fn new(cache: Arc<ConfigCache>, hosts_path: impl Into<PathBuf>) -> Self {
        Self::with_reload(cache, hosts_path, LogOnlyReload)
    }
}

impl<R: ReloadTrigger> ManagedConfigService<R> {
    /// Creates a service with an explicit reload trigger.
    #[must_use]
    pub fn with_reload(cache: Arc<ConfigCache>, hosts_path: impl Into<PathBuf>, reload: R) -> Self {
        Self {
            cache,
            hosts_path: hosts_path.into(),
            reload,
        }
    }

    /// Reads the managed file's structured lines from the current
    /// snapshot. Degrades to an empty result when not configured.
    ///
    /// # Errors
    ///
    /// Fails when the snapshot itself cannot be produced.
    pub async fn read_managed_config(&self) -> Result<ManagedConfig, ServiceError> {
        let snapshot = self.cache.snapshot().await?;
        if snapshot.set.managed_file_path.is_none() {
            return Ok(ManagedConfig::default());
        }

        let addn_hosts_path = snapshot.managed_lines.iter().find_map(|line| {
            if let LineKind::AddnHosts { path } = &line.kind {
                Some(path.trim().to_string())
            } else {
                None
            }
        });

        Ok(ManagedConfig {
            lines: snapshot.managed_lines.clone(),
            addn_hosts_path,
        })
    }

    /// The managed file's reservations, ids assigned, from the cache.
    ///
    /// # Errors
    ///
    /// Fails when the snapshot cannot be produced.
    pub async fn read_dhcp_hosts(&self) -> Result<Vec<DhcpHostEntry>, ServiceError> {
        Ok(self.cache.snapshot().await?.dhcp_hosts.clone())
    }

    /// Rewrites the managed file with the given lines.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotConfigured`] without a managed path; I/O
    /// errors from the write itself.
    pub async fn write_managed_config(
        &self,
        lines: Vec<ConfigLine>,
    ) -> Result<ReloadOutcome, ServiceError> {
        let snapshot = self.cache.snapshot().await?;
        self.persist(&snapshot.set, lines).await
    }

    /// Applies reservation edits: incoming entries are matched to file
    /// positions by stable id, replaced in place, appended when new,
    /// and dropped when marked deleted.
    ///
    /// # Errors
    ///
    /// [`ServiceError::MacConflict`] when an incoming MAC is already
    /// reserved in a file this tool does not manage (the managed file
    /// is left untouched); otherwise as
    /// [`write_managed_config`](Self::write_managed_config).
    pub async fn write_dhcp_hosts(
        &self,
        entries: Vec<DhcpHostEntry>,
    ) -> Result<ReloadOutcome, ServiceError> {
        let snapshot = self.cache.snapshot().await?;
        let Some(managed_path) = snapshot.set.managed_file_path.clone() else {
            return Err(ServiceError::NotConfigured);
        };

        self.check_mac_conflicts(&snapshot.set, &entries).await?;

        // Work on what is on disk right now, not the cached view: an
        // external edit between refreshes must not be resurrected.
        let mut lines = read_managed_lines(&managed_path).await?;

        let host_line_indices: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| matches!(line.kind, LineKind::DhcpHost { .. }))
            .map(|(i, _)| i)
            .collect();
        let existing = collect_dhcp_hosts(&lines, Some(&managed_path), true);
        let mut index_by_id: HashMap<String, usize> = existing
            .iter()
            .zip(&host_line_indices)
            .map(|(entry, &index)| (entry.id.clone(), index))
            .collect();

        let mut removals = Vec::new();
        let mut appended = Vec::new();
        for entry in entries {
            match index_by_id.remove(&entry.id) {
                Some(index) if entry.is_deleted => removals.push(index),
                Some(index) => {
                    lines[index].kind = LineKind::DhcpHost {
                        entry: entry.normalized_for_write(),
                    };
                }
                // Deleting an entry that is already gone is a no-op.
                None if entry.is_deleted => {}
                None => appended.push(ConfigLine::dhcp_host(entry.normalized_for_write())),
            }
        }

        removals.sort_unstable_by(|a, b| b.cmp(a));
        for index in removals {
            lines.remove(index);
        }
        lines.extend(appended);

        self.persist(&snapshot.set, lines).await
    }

    /// Applies generic option edits against the managed file's opaque
    /// lines.
    ///
    /// # Errors
    ///
    /// Validation errors for unknown keys, for value shapes that do not
    /// match the option's merge kind, and for the options that have
    /// dedicated editors; otherwise as
    /// [`write_managed_config`](Self::write_managed_config).
    pub async fn apply_option_changes(
        &self,
        changes: Vec<OptionChange>,
    ) -> Result<ReloadOutcome, ServiceError> {
        let snapshot = self.cache.snapshot().await?;
        let Some(managed_path) = snapshot.set.managed_file_path.clone() else {
            return Err(ServiceError::NotConfigured);
        };

        let mut lines = read_managed_lines(&managed_path).await?;
        for change in &changes {
            apply_change(&mut lines, change)?;
        }

        self.persist(&snapshot.set, lines).await
    }

    /// The shared write path: addn-hosts invariant, hosts-file
    /// existence, atomic write, include registration, cache patch,
    /// reload.
    async fn persist(
        &self,
        set: &ConfigSet,
        mut lines: Vec<ConfigLine>,
    ) -> Result<ReloadOutcome, ServiceError> {
        let Some(managed_path) = set.managed_file_path.clone() else {
            return Err(ServiceError::NotConfigured);
        };

        enforce_single_addn_hosts(&mut lines, &self.hosts_path.to_string_lossy());
        ensure_file_exists(&self.hosts_path).await?;
        renumber(&mut lines);

        write_atomic(&managed_path, serialize_lines(&lines)).await?;
        ensure_managed_include(&set.main_config_path, &managed_path).await?;
        self.cache.note_self_write(lines).await;
        tracing::info!(path = %managed_path.display(), "managed config written");

        match self.reload.reload().await {
            Ok(()) => Ok(ReloadOutcome::Completed),
            Err(error) => {
                tracing::warn!(%error, "reload after managed-config write failed");
                Ok(ReloadOutcome::Failed {
                    message: error.to_string(),
                })
            }
        }
    }

    /// Rejects incoming reservations whose MACs already appear in files
    /// this tool does not manage. Unreadable third-party files are
    /// skipped — one broken include must not block every edit.
    async fn check_mac_conflicts(
        &self,
        set: &ConfigSet,
        entries: &[DhcpHostEntry],
    ) -> Result<(), ServiceError> {
        let incoming: HashSet<String> = entries
            .iter()
            .filter(|e| !e.is_deleted && !e.is_comment)
            .flat_map(DhcpHostEntry::normalized_macs)
            .collect();
        if incoming.is_empty() {
            return Ok(());
        }

        for file in set.unmanaged_entries() {
            let Ok(content) = tokio::fs::read_to_string(&file.path).await else {
                tracing::warn!(
                    path = %file.path.display(),
                    "skipping unreadable file during MAC conflict check"
                );
                continue;
            };
            let raw: Vec<&str> = content.lines().collect();
            let lines = parse_file(&raw);

            for foreign in collect_dhcp_hosts(&lines, Some(&file.path), false) {
                if foreign.is_comment {
                    continue;
                }
                for mac in foreign.normalized_macs() {
                    if incoming.contains(&mac) {
                        return Err(ServiceError::MacConflict {
                            mac,
                            file: file.file_name.clone(),
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

/// Reads and parses the managed file fresh from disk; missing reads as
/// empty (first write creates it).
async fn read_managed_lines(path: &std::path::Path) -> Result<Vec<ConfigLine>, ServiceError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(source) => {
            return Err(ServiceError::Conf(ConfError::Read {
                path: path.to_path_buf(),
                source,
            }));
        }
    };
    let raw: Vec<&str> = content.lines().collect();
    Ok(parse_file(&raw))
}

/// Serialized file content: one directive per line, UTF-8 without a
/// BOM — dnsmasq would parse a BOM as part of the first option.
fn serialize_lines(lines: &[ConfigLine]) -> String {
    let mut content = lines.iter().map(to_line).collect::<Vec<_>>().join("\n");
    if !content.is_empty() {
        content.push('\n');
    }
    content
}

/// Keeps exactly one `addn-hosts=` line, pointing at the app-writable
/// hosts file: the first existing line is redirected, later ones are
/// dropped, and a missing one is inserted at the top.
fn enforce_single_addn_hosts(lines: &mut Vec<ConfigLine>, hosts_path: &str) {
    let mut seen = false;
    lines.retain_mut(|line| {
        if let LineKind::AddnHosts { path } = &mut line.kind {
            if seen {
                return false;
            }
            seen = true;
            *path = hosts_path.to_string();
        }
        true
    });

    if !seen {
        lines.insert(0, ConfigLine::addn_hosts(hosts_path));
    }
}

fn apply_change(lines: &mut Vec<ConfigLine>, change: &OptionChange) -> Result<(), ServiceError> {
    let Some(option) = DnsmasqOption::from_key(&change.key) else {
        return Err(ServiceError::Validation(format!(
            "unknown option '{}'",
            change.key
        )));
    };
    if matches!(option, DnsmasqOption::AddnHosts | DnsmasqOption::DhcpHost) {
        return Err(ServiceError::Validation(format!(
            "'{option}' has a dedicated editor and cannot be changed here"
        )));
    }

    let matches: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| matches_option(line, option))
        .map(|(i, _)| i)
        .collect();

    match (option.merge_kind(), &change.value) {
        (MergeKind::Flag, ChangeValue::Flag { enabled: false }) => {
            remove_indices(lines, &matches);
        }
        (MergeKind::Flag, ChangeValue::Flag { enabled: true }) => {
            if matches.is_empty() {
                lines.push(ConfigLine::other(option.key()));
            }
        }
        (MergeKind::LastWins, ChangeValue::Scalar { value: Some(value) }) => {
            let text = format!("{}={value}", option.key());
            if let Some((&first, rest)) = matches.split_first() {
                lines[first].kind = LineKind::Other { raw: text };
                remove_indices(lines, rest);
            } else {
                lines.push(ConfigLine::other(text));
            }
        }
        (MergeKind::LastWins, ChangeValue::Scalar { value: None }) => {
            remove_indices(lines, &matches);
        }
        (MergeKind::Cumulative, ChangeValue::List { values }) => {
            let insert_at = matches.first().copied();
            remove_indices(lines, &matches);

            let new_lines = values
                .iter()
                .map(|value| ConfigLine::other(format!("{}={value}", option.key())));
            if let Some(mut position) = insert_at {
                for line in new_lines {
                    lines.insert(position, line);
                    position += 1;
                }
            } else {
                lines.extend(new_lines);
            }
        }
        _ => {
            return Err(ServiceError::Validation(format!(
                "value shape does not match the merge kind of '{option}'"
            )));
        }
    }

    Ok(())
}

/// The generic editor only sees opaque lines: the trimmed text must be
/// the bare key or start with `key=`.
fn matches_option(line: &ConfigLine, option: DnsmasqOption) -> bool {
    let LineKind::Other { raw } = &line.kind else {
        return false;
    };
    let trimmed = raw.trim();
    trimmed == option.key()
        || trimmed
            .strip_prefix(option.key())
            .is_some_and(|rest| rest.starts_with('='))
}

fn remove_indices(lines: &mut Vec<ConfigLine>, indices: &[usize]) {
    for &index in indices.iter().rev() {
        lines.remove(index);
    }
}
