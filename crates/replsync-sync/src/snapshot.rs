// snapshot.rs — Last known type of every path in the working tree.
//
// A delete notification arrives after the path is gone, so it can never
// be re-stat'd. The snapshot, rebuilt after every processed event, is
// what classifies a deletion as file vs directory. It must always
// reflect the tree as of the most recently handled event — a stale
// snapshot would misclassify the next deletion.

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path};

use crate::error::SyncError;

/// What a watched path was, the last time we looked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    File,
    Directory,
}

/// Mapping from forward-slash relative path to [`PathKind`].
#[derive(Debug, Default)]
pub struct Snapshot {
    entries: HashMap<String, PathKind>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot with the current state of the tree under
    /// `root`. O(tree size); fine for the small filesystems boards have.
    pub fn rebuild(&mut self, root: &Path) -> Result<(), SyncError> {
        self.entries.clear();
        walk(root, root, &mut self.entries)
    }

    pub fn kind_of(&self, relative_path: &str) -> Option<PathKind> {
        self.entries.get(relative_path).copied()
    }

    pub fn is_dir(&self, relative_path: &str) -> bool {
        self.kind_of(relative_path) == Some(PathKind::Directory)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn walk(
    root: &Path,
    dir: &Path,
    entries: &mut HashMap<String, PathKind>,
) -> Result<(), SyncError> {
    let read = fs::read_dir(dir).map_err(|source| SyncError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    for item in read {
        let item = item.map_err(|source| SyncError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = item.path();
        let Some(rel) = relative_key(root, &path) else {
            continue;
        };
        if path.is_dir() {
            entries.insert(rel, PathKind::Directory);
            walk(root, &path, entries)?;
        } else {
            entries.insert(rel, PathKind::File);
        }
    }
    Ok(())
}

/// Forward-slash relative key for a path under `root`. `None` when the
/// path is outside the tree or is the root itself.
pub fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}
