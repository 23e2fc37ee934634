// orchestrator.rs — One-time pull, then push-only steady state.
//
// Exactly one remote command is ever in flight: every change event is
// handled on this loop, and the notify thread only feeds the channel.
// Remote failures in steady state leave that single operation unapplied
// and the session running — the channel has no retry story, and a
// half-applied retry would be worse than a logged miss.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use notify::RecommendedWatcher;
use tracing::{debug, error, info, warn};

use crate::error::SyncError;
use crate::remote::RemoteStore;
use crate::snapshot::{relative_key, Snapshot};
use crate::watcher::{self, ChangeEvent};
use crate::workdir::WorkDir;

use replsync_repl::EntryKind;

/// How long the event loop waits on the channel before re-checking the
/// cancellation flag.
const CANCEL_POLL: Duration = Duration::from_millis(200);

/// Owns the whole session state: remote facade, working directory,
/// snapshot, and watcher handle. Teardown is an owned sequence that
/// runs on every exit path (explicitly or via Drop), guarded so a
/// second invocation is a no-op.
pub struct Orchestrator<R: RemoteStore> {
    remote: R,
    workdir: WorkDir,
    snapshot: Snapshot,
    watcher: Option<RecommendedWatcher>,
    cleaned: bool,
}

impl<R: RemoteStore> Orchestrator<R> {
    pub fn new(remote: R, workdir: WorkDir) -> Self {
        Self {
            remote,
            workdir,
            snapshot: Snapshot::new(),
            watcher: None,
            cleaned: false,
        }
    }

    pub fn local_root(&self) -> &Path {
        self.workdir.path()
    }

    /// Materialize the remote tree locally. Runs once, at session start
    /// — the only point where data flows board→host. File contents are
    /// CRLF→LF normalized on the way in; the push direction preserves
    /// bytes as given.
    pub fn pull(&mut self) -> Result<(), SyncError> {
        info!("beginning file sync from board");
        let entries = self.remote.list_all(true)?;

        for entry in &entries {
            debug!(path = %entry.path, "syncing");
            let local = self.workdir.path().join(&entry.path);
            match entry.kind {
                EntryKind::Directory => {
                    fs::create_dir_all(&local).map_err(|source| SyncError::Io {
                        path: local.clone(),
                        source,
                    })?;
                }
                EntryKind::File => {
                    if let Some(parent) = local.parent() {
                        fs::create_dir_all(parent).map_err(|source| SyncError::Io {
                            path: parent.to_path_buf(),
                            source,
                        })?;
                    }
                    let content = entry.contents.clone().unwrap_or_default();
                    fs::write(&local, normalize_newlines(content)).map_err(|source| {
                        SyncError::Io {
                            path: local.clone(),
                            source,
                        }
                    })?;
                }
            }
        }

        self.snapshot.rebuild(self.workdir.path())?;
        info!(entries = entries.len(), "file sync complete");
        Ok(())
    }

    /// Start the recursive watcher on the working directory and return
    /// the event channel for [`run`](Self::run).
    pub fn start_watching(&mut self) -> Result<Receiver<ChangeEvent>, SyncError> {
        let (tx, rx) = mpsc::channel();
        self.watcher = Some(watcher::watch(self.workdir.path(), tx)?);
        info!(dir = %self.workdir.path().display(), "watching for local changes");
        Ok(rx)
    }

    /// Steady-state loop: service events until cancelled (or the
    /// watcher side of the channel disappears), then tear down.
    pub fn run(&mut self, rx: Receiver<ChangeEvent>, cancel: Arc<AtomicBool>) {
        while !cancel.load(Ordering::Relaxed) {
            match rx.recv_timeout(CANCEL_POLL) {
                Ok(event) => self.handle_event(event),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        self.cleanup();
    }

    /// Apply one local change to the board: at most one remote call,
    /// then a full snapshot rebuild so the next deletion classifies
    /// against current state.
    pub fn handle_event(&mut self, event: ChangeEvent) {
        let root = self.workdir.path().to_path_buf();
        let path = match &event {
            ChangeEvent::Created(p) | ChangeEvent::Modified(p) | ChangeEvent::Removed(p) => {
                p.clone()
            }
        };
        let Some(rel) = relative_key(&root, &path) else {
            return;
        };

        let result = match event {
            ChangeEvent::Created(_) => match fs::metadata(&path) {
                Ok(meta) if meta.is_dir() => {
                    info!(path = %rel, "directory created");
                    self.remote.create_dir(&rel)
                }
                Ok(_) => {
                    info!(path = %rel, "file created");
                    self.push_file(&path, &rel)
                }
                // Vanished before we could look — raced with a delete.
                Err(_) => {
                    debug!(path = %rel, "created path vanished, skipping");
                    Ok(())
                }
            },
            ChangeEvent::Modified(_) => {
                if !path.exists() {
                    debug!(path = %rel, "modified path vanished, skipping");
                    Ok(())
                } else if path.is_dir() {
                    Ok(())
                } else {
                    info!(path = %rel, "file modified");
                    self.push_file(&path, &rel)
                }
            }
            ChangeEvent::Removed(_) => {
                if self.snapshot.is_dir(&rel) {
                    info!(path = %rel, "directory deleted");
                    self.remote.delete_dir(&rel)
                } else {
                    info!(path = %rel, "file deleted");
                    self.remote.delete_file(&rel)
                }
            }
        };

        if let Err(e) = result {
            error!(path = %rel, error = %e, "sync operation failed, leaving unapplied");
        }

        if let Err(e) = self.snapshot.rebuild(&root) {
            warn!(error = %e, "snapshot rebuild failed");
        }
    }

    fn push_file(&mut self, path: &Path, rel: &str) -> Result<(), replsync_repl::ReplError> {
        let content = match fs::read(path) {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %rel, error = %e, "file unreadable, skipping");
                return Ok(());
            }
        };
        self.remote.write_file(rel, &content)
    }

    /// Teardown, exactly once: stop the watcher, delete the working
    /// tree, soft-reboot the board. Ordering matters — the watcher must
    /// stop before its tree is deleted, and the board is restored last.
    pub fn cleanup(&mut self) {
        if self.cleaned {
            return;
        }
        self.cleaned = true;

        info!("starting cleanup");
        self.watcher = None;
        self.workdir.remove();
        if let Err(e) = self.remote.soft_reboot() {
            warn!(error = %e, "failed to reboot board during cleanup");
        }
        info!("cleanup complete");
    }
}

impl<R: RemoteStore> Drop for Orchestrator<R> {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// CRLF→LF, applied to pulled contents only.
fn normalize_newlines(content: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len());
    let mut iter = content.iter().peekable();
    while let Some(&b) = iter.next() {
        if b == b'\r' && iter.peek() == Some(&&b'\n') {
            continue;
        }
        out.push(b);
    }
    out
}
