// workdir.rs — The process-exclusive local mirror of the remote tree.
//
// Created fresh at startup under the OS temp convention, deleted
// wholesale at cleanup. Deletion failure is logged and swallowed: the
// remaining teardown steps (reboot, transport close) must still run.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::warn;

use crate::error::SyncError;

/// A freshly created temporary directory holding the mirrored tree.
pub struct WorkDir {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl WorkDir {
    pub fn create() -> Result<Self, SyncError> {
        let dir = TempDir::with_prefix("replsync-").map_err(|source| SyncError::Io {
            path: std::env::temp_dir(),
            source,
        })?;
        // Canonicalized so paths reported by the watcher (which resolves
        // symlinks, e.g. /var vs /private/var on macOS) compare equal.
        let path = dir
            .path()
            .canonicalize()
            .unwrap_or_else(|_| dir.path().to_path_buf());
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the tree. Safe to call more than once; must not be called
    /// while a watcher is still observing the directory (deleting a
    /// watched tree self-triggers delete events).
    pub fn remove(&mut self) {
        if let Some(dir) = self.dir.take() {
            if let Err(e) = dir.close() {
                warn!(path = %self.path.display(), error = %e, "failed to delete working directory");
            }
        }
    }
}
