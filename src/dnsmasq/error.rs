//! Error types for config-set discovery and merging.

use std::path::PathBuf;

use thiserror::Error;

use super::directive::DirectiveError;

/// Error type for reading and resolving the configuration set.
///
/// Auxiliary-file problems are not represented here: an unreadable
/// third-party include is skipped with a warning at the point of use.
/// These variants cover failures that make the operation meaningless.
#[derive(Debug, Error)]
pub enum ConfError {
    /// A required file could not be read (the main config, or the
    /// managed file when it is known to exist).
    #[error("failed to read '{}': {source}", path.display())]
    Read {
        /// The file that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A write to a file this tool owns failed.
    #[error("failed to write '{}': {source}", path.display())]
    Write {
        /// The file that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The managed file contains a line that does not tokenize.
    #[error("managed config is corrupt: {0}")]
    Corrupt(#[from] DirectiveError),
}
