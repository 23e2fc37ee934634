//! # replsync-repl
//!
//! Request/response protocol on top of a console that was never designed
//! as an RPC transport.
//!
//! The board's interactive REPL has no message framing, no command IDs,
//! and no completion signal beyond echoed text and timing. This crate
//! layers three things on top of the raw [`Console`] channel:
//!
//! 1. [`Repl`] — sends one logical command per line and reconstructs the
//!    response by recognizing the echoed command and discarding prompt
//!    noise ([`engine`]).
//! 2. [`bootstrap`] — the session handshake: soft-reboot, interrupt, and
//!    upload of the fixed remote-side file procedures.
//! 3. [`RemoteFs`] — high-level filesystem operations, one engine call
//!    each, with path normalization and content escaping
//!    ([`remote_fs`], [`literal`]).
//!
//! [`Console`]: replsync_console::Console

pub mod bootstrap;
pub mod engine;
pub mod error;
pub mod literal;
pub mod remote_fs;

pub use engine::{Command, Repl, Response, Timing};
pub use error::ReplError;
pub use remote_fs::{EntryKind, RemoteEntry, RemoteFs};
