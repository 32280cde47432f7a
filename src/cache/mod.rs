//! Process-wide config-set snapshot cache.
//!
//! Wraps resolve + merge + managed-file read behind an
//! invalidate-on-demand snapshot. The cache is a two-state machine —
//! clean with a snapshot, or dirty — guarded by a single async mutex.
//! Watcher callbacks and the staleness timeout both feed the same
//! mark-dirty transition; watchers carry no further authority, and the
//! timeout guarantees eventual correctness when an event is missed.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::dnsmasq::{
    ConfError, ConfigLine, ConfigSet, DhcpHostEntry, EffectiveConfig, EffectiveSources,
    LoadedFile, collect_dhcp_hosts, merge, parse_file, resolve_config_set,
};

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

/// Tuning for snapshot reuse and self-write suppression.
#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    /// Maximum age before a clean snapshot is re-read anyway.
    pub staleness: Duration,
    /// How long after our own write a watcher event for the managed
    /// file is attributed to that write and discarded.
    pub suppression_window: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            staleness: Duration::from_secs(120),
            suppression_window: Duration::from_millis(1500),
        }
    }
}

/// One immutable view of the whole configuration, produced atomically
/// by a single refresh and handed out by reference until superseded.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSnapshot {
    /// The resolved file set.
    pub set: ConfigSet,
    /// Merged option values.
    pub effective: EffectiveConfig,
    /// Attribution for every merged value.
    pub sources: EffectiveSources,
    /// The managed file's structured lines (empty when not configured
    /// or not yet created).
    pub managed_lines: Vec<ConfigLine>,
    /// Reservations parsed from the managed file, ids assigned.
    pub dhcp_hosts: Vec<DhcpHostEntry>,
}

#[derive(Debug, Default)]
struct CacheState {
    snapshot: Option<Arc<ConfigSnapshot>>,
    read_at: Option<Instant>,
    dirty: bool,
    last_self_write: Option<Instant>,
}

/// The snapshot cache. One instance per process; shared by reference.
#[derive(Debug)]
pub struct ConfigCache {
    main_config: PathBuf,
    managed_file_name: String,
    policy: CachePolicy,
    state: Mutex<CacheState>,
}

impl ConfigCache {
    /// Creates a cache with the default policy.
    #[must_use]
    pub fn new(main_config: impl Into<PathBuf>, managed_file_name: impl Into<String>) -> Self {
        Self::with_policy(main_config, managed_file_name, CachePolicy::default())
    }

    /// Creates a cache with explicit staleness/suppression tuning.
    #[must_use]
    pub fn with_policy(
        main_config: impl Into<PathBuf>,
        managed_file_name: impl Into<String>,
        policy: CachePolicy,
    ) -> Self {
        Self {
            main_config: main_config.into(),
            managed_file_name: managed_file_name.into(),
            policy,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Returns the current snapshot, re-reading from disk only when the
    /// cached one is dirty or older than the staleness threshold.
    ///
    /// Callers arriving during a refresh wait on the cache lock and then
    /// observe the freshly published snapshot; two refreshes never run
    /// concurrently and a partially merged state is never visible.
    ///
    /// # Errors
    ///
    /// Fails when the main config (or an existing managed file) cannot
    /// be read. Auxiliary files are skipped with a warning instead.
    pub async fn snapshot(&self) -> Result<Arc<ConfigSnapshot>, ConfError> {
        let mut state = self.state.lock().await;

        if !state.dirty {
            if let (Some(snapshot), Some(read_at)) = (&state.snapshot, state.read_at) {
                if read_at.elapsed() < self.policy.staleness {
                    return Ok(Arc::clone(snapshot));
                }
            }
        }

        let snapshot = Arc::new(self.refresh().await?);
        state.snapshot = Some(Arc::clone(&snapshot));
        state.read_at = Some(Instant::now());
        state.dirty = false;
        tracing::debug!(
            files = snapshot.set.entries.len(),
            dhcp_hosts = snapshot.dhcp_hosts.len(),
            "config snapshot refreshed"
        );
        Ok(snapshot)
    }

    /// Forces the next [`snapshot`](Self::snapshot) call to re-read.
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        state.dirty = true;
        tracing::debug!("config snapshot invalidated");
    }

    /// Records that this process just wrote the managed file.
    ///
    /// Patches the managed content into a fresh snapshot generation
    /// without touching the disk, and opens the suppression window so
    /// the watcher callback for our own write is not treated as an
    /// external change.
    pub async fn note_self_write(&self, managed_lines: Vec<ConfigLine>) {
        let mut state = self.state.lock().await;

        if let Some(current) = &state.snapshot {
            let managed_path = current.set.managed_file_path.as_deref();
            let dhcp_hosts = collect_dhcp_hosts(&managed_lines, managed_path, true);
            state.snapshot = Some(Arc::new(ConfigSnapshot {
                set: current.set.clone(),
                effective: current.effective.clone(),
                sources: current.sources.clone(),
                managed_lines,
                dhcp_hosts,
            }));
        }

        state.last_self_write = Some(Instant::now());
    }

    /// Feeds one watcher event into the state machine.
    ///
    /// An event for the managed file inside the suppression window is
    /// our own write echoing back and is discarded; everything else
    /// marks the cache dirty.
    pub async fn handle_file_event(&self, path: &Path) {
        let mut state = self.state.lock().await;

        let is_managed = state
            .snapshot
            .as_ref()
            .and_then(|s| s.set.managed_file_path.as_deref())
            .is_some_and(|managed| managed == path);

        if is_managed {
            if let Some(written_at) = state.last_self_write {
                if written_at.elapsed() <= self.policy.suppression_window {
                    tracing::debug!(path = %path.display(), "ignoring watcher echo of our own write");
                    return;
                }
            }
        }

        tracing::debug!(path = %path.display(), "file change observed, marking snapshot dirty");
        state.dirty = true;
    }

    /// Whether the next snapshot call will re-read from disk because of
    /// an invalidation (staleness aside).
    pub async fn is_dirty(&self) -> bool {
        self.state.lock().await.dirty
    }

    /// Resolves, reads and merges the whole set. Pure read; publishes
    /// nothing — the caller swaps the result in under the lock.
    async fn refresh(&self) -> Result<ConfigSnapshot, ConfError> {
        let set = resolve_config_set(&self.main_config, &self.managed_file_name).await?;

        let mut loaded = Vec::with_capacity(set.entries.len());
        let mut managed_content: Option<String> = None;

        for entry in &set.entries {
            match tokio::fs::read_to_string(&entry.path).await {
                Ok(content) => {
                    if entry.is_managed {
                        managed_content = Some(content.clone());
                    }
                    loaded.push(LoadedFile::from_content(entry.clone(), &content));
                }
                Err(source)
                    if entry.is_managed && source.kind() != std::io::ErrorKind::NotFound =>
                {
                    return Err(ConfError::Read {
                        path: entry.path.clone(),
                        source,
                    });
                }
                Err(source) if entry.is_managed => {
                    tracing::debug!(
                        path = %entry.path.display(),
                        error = %source,
                        "managed file not present yet"
                    );
                }
                Err(source) => {
                    tracing::warn!(
                        path = %entry.path.display(),
                        error = %source,
                        "skipping unreadable config-set file"
                    );
                }
            }
        }

        let (effective, sources) = merge(&loaded);

        let managed_lines = managed_content.map_or_else(Vec::new, |content| {
            let raw: Vec<&str> = content.lines().collect();
            parse_file(&raw)
        });
        let dhcp_hosts =
            collect_dhcp_hosts(&managed_lines, set.managed_file_path.as_deref(), true);

        Ok(ConfigSnapshot {
            set,
            effective,
            sources,
            managed_lines,
            dhcp_hosts,
        })
    }
}
