//! Mtime-polling watcher implementation.
//!
//! [`DirectoryWatcher`] is the builder; [`WatchStream`] periodically
//! scans the directory and yields batches of [`FileEvent`] whenever a
//! file's modification stamp changes, a file appears, or one goes away.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, SystemTime};

use tokio::time::{Interval, interval};
use tokio_stream::Stream;

use crate::time::{Clock, SystemClock};

use super::{FileEvent, WatchError};

/// Per-file identity stamp: modification time plus length. Comparing
/// both rides out filesystems with coarse mtime granularity.
type Stamp = (SystemTime, u64);

/// Polling-based directory watcher.
#[derive(Debug)]
pub struct DirectoryWatcher<C = SystemClock> {
    dir: PathBuf,
    poll_interval: Duration,
    clock: C,
}

impl DirectoryWatcher<SystemClock> {
    /// Creates a watcher over `dir` with the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::NotADirectory`] when `dir` is missing, so
    /// the caller can degrade to timeout-only operation.
    pub fn new(dir: PathBuf, poll_interval: Duration) -> Result<Self, WatchError> {
        Self::with_clock(dir, poll_interval, SystemClock)
    }
}

impl<C: Clock> DirectoryWatcher<C> {
    /// Creates a watcher with an injected clock (for tests).
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::NotADirectory`] when `dir` is missing.
    pub fn with_clock(dir: PathBuf, poll_interval: Duration, clock: C) -> Result<Self, WatchError> {
        if !dir.is_dir() {
            return Err(WatchError::NotADirectory { path: dir });
        }
        Ok(Self {
            dir,
            poll_interval,
            clock,
        })
    }

    /// Converts the watcher into an event stream.
    ///
    /// The current directory state becomes the baseline; only changes
    /// after this call are reported. The stream never ends on its own.
    #[must_use]
    pub fn into_stream(self) -> WatchStream<C> {
        let known = scan(&self.dir);
        WatchStream {
            dir: self.dir,
            clock: self.clock,
            interval: interval(self.poll_interval),
            known,
        }
    }
}

/// A stream of file-change batches produced by polling.
pub struct WatchStream<C> {
    dir: PathBuf,
    clock: C,
    interval: Interval,
    known: HashMap<PathBuf, Stamp>,
}

impl<C: Clock> WatchStream<C> {
    /// Scans once and returns the changes since the previous scan.
    fn poll_once(&mut self) -> Vec<FileEvent> {
        let current = scan(&self.dir);
        let observed_at = self.clock.now();
        let mut events = Vec::new();

        for (path, stamp) in &current {
            if self.known.get(path) != Some(stamp) {
                events.push(FileEvent {
                    path: path.clone(),
                    observed_at,
                });
            }
        }
        for path in self.known.keys() {
            if !current.contains_key(path) {
                events.push(FileEvent {
                    path: path.clone(),
                    observed_at,
                });
            }
        }

        self.known = current;
        events
    }
}

impl<C: Clock + Unpin> Stream for WatchStream<C> {
    type Item = Vec<FileEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if Pin::new(&mut self.interval).poll_tick(cx).is_pending() {
                return Poll::Pending;
            }

            let events = self.poll_once();
            if !events.is_empty() {
                return Poll::Ready(Some(events));
            }
            // Nothing changed; loop back so poll_tick re-registers the waker.
        }
    }
}

/// Reads the directory's current file stamps. Scan errors produce an
/// empty or partial view rather than terminating the stream; transient
/// problems heal on the next tick.
fn scan(dir: &Path) -> HashMap<PathBuf, Stamp> {
    let mut stamps = HashMap::new();
    let Ok(read_dir) = std::fs::read_dir(dir) else {
        return stamps;
    };

    for entry in read_dir.flatten() {
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let Ok(modified) = metadata.modified() else {
            continue;
        };
        stamps.insert(entry.path(), (modified, metadata.len()));
    }

    stamps
}
