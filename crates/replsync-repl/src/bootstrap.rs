// bootstrap.rs — One-time session handshake and remote procedure upload.
//
// Drives the console to a known-clean prompt (soft-reboot, then
// interrupt) and uploads the five file procedures the rest of the
// session treats as the remote filesystem API. The procedure bodies are
// a fixed contract — the facade composes calls against these exact
// names and signatures.
//
// Failure here is not independently detectable: an unresponsive device
// silently produces unusable procedures and every later call fails at
// response-parsing time. Callers treat that as fatal to the session.

use replsync_console::Console;
use tracing::info;

use crate::engine::{Command, Repl};
use crate::error::ReplError;

/// `read_file(filename) -> bytes`
const READ_FILE_PROC: &str = "def read_file(filename): return open(filename, 'rb').read()";

/// `write_file(filename, content)`
const WRITE_FILE_PROC: &str =
    "def write_file(filename, content): f = open(filename, 'wb'); f.write(content); f.close()";

/// `mkdir_recursive(directory)` — stats each path segment left-to-right
/// and creates only the missing ones, so repeated calls are idempotent.
/// This is the one definition that won't survive as a one-liner; it is
/// uploaded one physical line at a time.
const MKDIR_PROC: &str = r#"def mkdir_recursive(directory):
    import os; path = "";
    for d in directory.split('/'):
        path = f"{path}/{d}" if path else d;
        try: os.stat(path);
        except OSError: os.mkdir(path);
"#;

/// `rmdir_recursive(directory)` — removes contents before the directory
/// itself; bit 0x4000 of the stat mode flags a child as a directory.
const RMDIR_PROC: &str = r#"def rmdir_recursive(directory): import os; [rmdir_recursive(directory + "/" + entry) if os.stat(directory + "/" + entry)[0] & 0x4000 else os.remove(directory + "/" + entry) for entry in os.listdir(directory)]; os.rmdir(directory)"#;

/// `list_files_recursively(directory="", get_contents=False)` — list of
/// `{path, type, contents}` records, paths relative to the given root
/// with forward-slash separators. Uses `read_file` for contents.
const LIST_FILES_PROC: &str = r#"def list_files_recursively(directory="", get_contents=False): import os; return [{"path": entry if directory == "" else directory + "/" + entry, "type": "directory" if os.stat(entry if directory == "" else directory + "/" + entry)[0] & 0x4000 else "file", "contents": read_file(entry if directory == "" else directory + "/" + entry) if get_contents and not os.stat(entry if directory == "" else directory + "/" + entry)[0] & 0x4000 else None} for entry in os.listdir(directory)] + [item for entry in os.listdir(directory) if os.stat(entry if directory == "" else directory + "/" + entry)[0] & 0x4000 for item in list_files_recursively(entry if directory == "" else directory + "/" + entry, get_contents)]"#;

impl<C: Console> Repl<C> {
    /// Bring the board to a clean prompt and upload the remote
    /// procedures. Must run once before any [`RemoteFs`] operation.
    ///
    /// [`RemoteFs`]: crate::remote_fs::RemoteFs
    pub fn bootstrap(&mut self) -> Result<(), ReplError> {
        info!("soft rebooting the board");
        self.soft_reboot(true)?;

        info!("interrupting to reach an idle prompt");
        self.interrupt()?;

        info!("uploading remote file procedures");
        self.define(READ_FILE_PROC)?;
        self.define(WRITE_FILE_PROC)?;
        // Multi-line input is fragile on this channel: send the body one
        // physical line per command, then an empty command so the REPL
        // closes the block.
        for line in MKDIR_PROC.split('\n') {
            self.define(line)?;
        }
        self.define("")?;
        self.define(RMDIR_PROC)?;
        self.define(LIST_FILES_PROC)?;

        Ok(())
    }

    /// Upload one procedure definition, fire-and-forget. The two
    /// trailing blank lines are how the REPL knows the definition is
    /// complete.
    fn define(&mut self, code: &str) -> Result<(), ReplError> {
        let cmd = Command::new(format!("{code}\r\n\r\n")).fire_and_forget();
        self.execute(&cmd)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Timing;
    use crate::testutil::ScriptedConsole;
    use std::time::Duration;

    fn bootstrapped_console() -> ScriptedConsole {
        let timing = Timing {
            settle: Duration::ZERO,
            inter_read: Duration::ZERO,
            max_wait: Duration::from_millis(10),
            reboot_wait: Duration::ZERO,
            interrupt_wait: Duration::ZERO,
        };
        let mut repl = Repl::new(ScriptedConsole::new(&[]), timing);
        repl.bootstrap().unwrap();
        repl.console
    }

    #[test]
    fn handshake_sends_reboot_then_interrupt_first() {
        let console = bootstrapped_console();
        assert_eq!(console.sent[0], vec![0x04]);
        assert_eq!(console.sent[1], vec![0x03]);
    }

    #[test]
    fn all_five_procedures_are_uploaded() {
        let console = bootstrapped_console();
        let sent = console.sent_text();
        for name in [
            "def read_file(",
            "def write_file(",
            "def mkdir_recursive(",
            "def rmdir_recursive(",
            "def list_files_recursively(",
        ] {
            assert!(sent.contains(name), "missing upload of {name}");
        }
    }

    #[test]
    fn mkdir_is_uploaded_line_by_line_then_closed() {
        let console = bootstrapped_console();
        // Reboot + interrupt, read_file, write_file, then the mkdir
        // body: one write per physical line, plus the closing empty
        // command before rmdir is defined.
        let writes: Vec<String> = console
            .sent
            .iter()
            .map(|c| String::from_utf8_lossy(c).into_owned())
            .collect();
        let mkdir_first = writes
            .iter()
            .position(|w| w.contains("def mkdir_recursive"))
            .unwrap();
        let rmdir = writes
            .iter()
            .position(|w| w.contains("def rmdir_recursive"))
            .unwrap();
        // 7 physical lines (incl. the trailing empty one from the final
        // newline) plus the explicit block-closing command.
        assert_eq!(rmdir - mkdir_first, 8);
        assert!(!writes[mkdir_first].contains("os.mkdir"));
    }

    #[test]
    fn definitions_end_with_blank_lines() {
        let console = bootstrapped_console();
        let read_def = console
            .sent
            .iter()
            .map(|c| String::from_utf8_lossy(c).into_owned())
            .find(|w| w.contains("def read_file"))
            .unwrap();
        assert!(read_def.ends_with("\r\n\r\n\r\n"));
    }
}
