// watcher.rs — Local change notifications, translated and serialized.
//
// notify delivers raw events on its own thread. That thread must never
// touch the remote channel, so the callback only translates events into
// ChangeEvents and forwards them over an mpsc sender; the orchestrator's
// single worker loop is the sole consumer. Renames are folded into
// remove/create pairs — editors that save atomically (write temp file,
// rename over target) would otherwise never sync.

use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{trace, warn};

use crate::error::SyncError;

/// A local filesystem change, reduced to what the sync loop acts on.
/// Carries no type information — by the time a removal is processed the
/// path no longer exists, so classification is the snapshot's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Removed(PathBuf),
}

/// Start watching `root` recursively. Translated events are sent on
/// `tx`; the watcher stops when the returned handle is dropped.
pub fn watch(root: &Path, tx: Sender<ChangeEvent>) -> Result<RecommendedWatcher, SyncError> {
    let mut watcher = RecommendedWatcher::new(
        move |result: Result<Event, notify::Error>| match result {
            Ok(event) => {
                for change in translate(&event) {
                    trace!(?change, "local change");
                    // The receiver disappears during cleanup; nothing to
                    // do with events after that.
                    let _ = tx.send(change);
                }
            }
            Err(e) => warn!(error = %e, "watcher error"),
        },
        Config::default(),
    )?;
    watcher.watch(root, RecursiveMode::Recursive)?;
    Ok(watcher)
}

/// Map one raw notify event onto zero or more [`ChangeEvent`]s.
pub fn translate(event: &Event) -> Vec<ChangeEvent> {
    match &event.kind {
        EventKind::Create(_) => event.paths.iter().cloned().map(ChangeEvent::Created).collect(),

        EventKind::Remove(_) => event.paths.iter().cloned().map(ChangeEvent::Removed).collect(),

        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => {
                event.paths.iter().cloned().map(ChangeEvent::Removed).collect()
            }
            RenameMode::To => event.paths.iter().cloned().map(ChangeEvent::Created).collect(),
            RenameMode::Both if event.paths.len() == 2 => vec![
                ChangeEvent::Removed(event.paths[0].clone()),
                ChangeEvent::Created(event.paths[1].clone()),
            ],
            // Platforms that can't say which side a rename was: the
            // path's current existence decides.
            _ => event
                .paths
                .iter()
                .map(|p| {
                    if p.exists() {
                        ChangeEvent::Created(p.clone())
                    } else {
                        ChangeEvent::Removed(p.clone())
                    }
                })
                .collect(),
        },

        EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),

        EventKind::Modify(_) => event.paths.iter().cloned().map(ChangeEvent::Modified).collect(),

        _ => Vec::new(),
    }
}
