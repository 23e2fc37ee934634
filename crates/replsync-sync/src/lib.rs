//! # replsync-sync
//!
//! The synchronization engine: mirror the board's file tree into a local
//! working directory once, then push every local change back to the
//! board as it happens.
//!
//! Data flows board→host exactly once, at session start
//! ([`Orchestrator::pull`]). After that the [`watcher`] feeds local
//! change events into a single serialized loop ([`Orchestrator::run`])
//! that makes at most one remote call per event. Deletions are
//! classified against the [`Snapshot`] taken before the event — a
//! deleted path can no longer be inspected, so the snapshot is the only
//! source of truth for what was removed.

pub mod error;
pub mod orchestrator;
pub mod remote;
pub mod snapshot;
pub mod watcher;
pub mod workdir;

pub use error::SyncError;
pub use orchestrator::Orchestrator;
pub use remote::RemoteStore;
pub use snapshot::{PathKind, Snapshot};
pub use watcher::ChangeEvent;
pub use workdir::WorkDir;
