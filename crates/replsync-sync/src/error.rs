// error.rs — Error types for the sync engine.

use std::path::PathBuf;

use replsync_repl::ReplError;
use thiserror::Error;

/// Errors that can occur while mirroring or watching the local tree.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A remote operation failed. Fatal during the initial pull; during
    /// steady-state watching it is logged and the single operation is
    /// left unapplied.
    #[error("remote error: {0}")]
    Remote(#[from] ReplError),

    /// A local file operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The filesystem watcher could not be started.
    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),
}
