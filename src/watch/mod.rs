//! File-change watching.
//!
//! Watches the directories holding the config set and feeds change
//! events into the cache as mark-dirty signals. Watchers are best
//! effort: a directory that cannot be watched is logged and skipped,
//! and the cache's staleness timeout remains the correctness backstop.
//!
//! The pack's transport is mtime polling — a periodic scan diffing
//! per-file modification stamps — which keeps the watcher free of
//! platform notification APIs.

mod poller;

pub use poller::{DirectoryWatcher, WatchStream};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use thiserror::Error;
use tokio_stream::StreamExt;

use crate::cache::ConfigCache;

/// A change observed for one file in a watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    /// The file that changed (created, modified or removed).
    pub path: PathBuf,
    /// When the poller observed the change.
    pub observed_at: SystemTime,
}

/// Error type for watcher construction.
///
/// Failures here are recoverable by design: the caller logs and runs
/// without a watcher.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The directory to watch does not exist (or is not a directory).
    #[error("cannot watch '{}': not a directory", path.display())]
    NotADirectory {
        /// The offending path.
        path: PathBuf,
    },
}

/// Spawns one polling watcher per directory, feeding the cache.
///
/// Directories that cannot be watched are skipped with a warning.
/// Returns the spawned task handles so a caller can abort them on
/// shutdown.
pub fn spawn_cache_watchers(
    cache: Arc<ConfigCache>,
    dirs: Vec<PathBuf>,
    poll_interval: Duration,
) -> Vec<tokio::task::JoinHandle<()>> {
    let mut handles = Vec::new();

    for dir in dirs {
        let watcher = match DirectoryWatcher::new(dir.clone(), poll_interval) {
            Ok(watcher) => watcher,
            Err(error) => {
                tracing::warn!(dir = %dir.display(), %error, "running without a watcher");
                continue;
            }
        };

        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move {
            let mut stream = watcher.into_stream();
            while let Some(events) = stream.next().await {
                for event in events {
                    cache.handle_file_event(&event.path).await;
                }
            }
        }));
    }

    handles
}
