// error.rs — Error types for the serial console transport.

use thiserror::Error;

/// Errors that can occur on the serial transport.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// The serial port could not be opened. Fatal at startup — there is
    /// no session without a transport.
    #[error("failed to open serial port '{port}': {source}")]
    Open {
        port: String,
        source: serialport::Error,
    },

    /// A read or write on the open port failed.
    #[error("serial I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The port rejected a control operation (buffer clear, queue query).
    #[error("serial port error: {0}")]
    Port(#[from] serialport::Error),
}
