// serial.rs — Console implementation over a real serial port.
//
// Wraps a serialport handle with the line-oriented read shape the REPL
// protocol needs. The handle is held for the process lifetime; dropping
// the SerialConsole closes the OS handle.

use std::io::Read;
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort};
use tracing::debug;

use crate::error::ConsoleError;
use crate::Console;

/// Default baud rate for MicroPython boards.
pub const DEFAULT_BAUD: u32 = 115_200;

/// Default per-read timeout. Matches the reference transport's 1 s
/// readline timeout.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// A live serial connection to the board.
pub struct SerialConsole {
    port: Box<dyn SerialPort>,
}

impl SerialConsole {
    /// Open the named serial port.
    ///
    /// `read_timeout` bounds how long a single [`Console::read_line`]
    /// call may block waiting for bytes.
    pub fn open(
        port_name: &str,
        baud: u32,
        read_timeout: Duration,
    ) -> Result<Self, ConsoleError> {
        let port = serialport::new(port_name, baud)
            .timeout(read_timeout)
            .open()
            .map_err(|source| ConsoleError::Open {
                port: port_name.to_string(),
                source,
            })?;

        debug!(port = port_name, baud, "serial port opened");
        Ok(Self { port })
    }
}

impl Console for SerialConsole {
    fn send(&mut self, data: &[u8]) -> Result<(), ConsoleError> {
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }

    /// Read until LF or the read timeout, whichever comes first, and
    /// return the line with CR/LF stripped. A silent device yields an
    /// empty string rather than an error — the protocol layer treats
    /// "nothing arrived" as a timing signal, not a failure.
    fn read_line(&mut self) -> Result<String, ConsoleError> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];

        loop {
            match self.port.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {
                    if byte[0] == b'\n' {
                        break;
                    }
                    line.push(byte[0]);
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => break,
                Err(e) => return Err(ConsoleError::Io(e)),
            }
        }

        while line.last() == Some(&b'\r') {
            line.pop();
        }
        Ok(String::from_utf8_lossy(&line).into_owned())
    }

    fn bytes_waiting(&mut self) -> Result<usize, ConsoleError> {
        Ok(self.port.bytes_to_read()? as usize)
    }

    fn clear_input(&mut self) -> Result<(), ConsoleError> {
        self.port.clear(ClearBuffer::Input)?;
        Ok(())
    }
}
