// error.rs — Error types for the REPL protocol layer.

use replsync_console::ConsoleError;
use thiserror::Error;

/// Errors that can occur while driving the remote REPL.
#[derive(Debug, Error)]
pub enum ReplError {
    /// The underlying serial transport failed.
    #[error("console error: {0}")]
    Console(#[from] ConsoleError),

    /// The command echo never appeared within the maximum wait ceiling.
    /// Without it there is no way to tell a slow device from a dead one.
    #[error("command timed out after {waited_ms} ms: {command}")]
    CommandTimeout { command: String, waited_ms: u128 },

    /// A response did not match the expected shape for an operation.
    /// Not retried; the affected operation is simply unapplied.
    #[error("unexpected response to {operation}: {response:?}")]
    UnexpectedResponse {
        operation: &'static str,
        response: String,
    },

    /// The echoed literal in a response could not be parsed.
    #[error("malformed response literal: {reason}")]
    Parse { reason: String },
}
