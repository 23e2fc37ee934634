//! # replsync-console
//!
//! Raw serial transport to a board's interactive REPL.
//!
//! The [`Console`] trait is the seam everything above this crate is
//! generic over: the protocol engine and the sync orchestrator never
//! touch a serial handle directly, so they can be tested against
//! scripted fakes. [`SerialConsole`] is the one real implementation.

pub mod error;
pub mod serial;

pub use error::ConsoleError;
pub use serial::SerialConsole;

/// A duplex, line-oriented byte channel to a remote interactive console.
///
/// No retry or timing logic lives here — callers own all delays. The
/// transport only moves bytes.
pub trait Console {
    /// Write raw bytes to the remote side.
    fn send(&mut self, data: &[u8]) -> Result<(), ConsoleError>;

    /// Read one line of output, waiting at most the transport's read
    /// timeout. Returns whatever arrived (possibly an empty string),
    /// with the trailing CR/LF stripped.
    fn read_line(&mut self) -> Result<String, ConsoleError>;

    /// Number of bytes currently buffered on the input side.
    /// Non-blocking.
    fn bytes_waiting(&mut self) -> Result<usize, ConsoleError>;

    /// Discard everything currently buffered on the input side.
    fn clear_input(&mut self) -> Result<(), ConsoleError>;
}
