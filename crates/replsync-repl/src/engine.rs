// engine.rs — Command/Response engine over the raw console.
//
// One logical command is one line of remote code. The device echoes the
// command, prints whatever the statement produces, and returns to the
// `>>>` prompt — there is no end-of-response marker, so completion is
// detected purely by "no more buffered bytes right now". That makes the
// settle and inter-read delays load-bearing correctness parameters:
// too-short values truncate responses, and the protocol cannot detect
// truncation.

use std::thread;
use std::time::{Duration, Instant};

use replsync_console::Console;
use tracing::{debug, trace};

use crate::error::ReplError;

/// The REPL prompt marker. Lines consisting of (or starting with) this
/// are interactive noise, never payload.
const PROMPT: &str = ">>>";

/// Continuation prompt shown while the REPL waits for more input.
const CONTINUATION: &str = "...";

/// Every delay the protocol depends on, in one tunable place.
///
/// The defaults were chosen empirically for one hardware pairing
/// (Raspberry Pi Pico W over USB serial); porting to different hardware
/// means re-tuning these, not editing the engine.
#[derive(Debug, Clone)]
pub struct Timing {
    /// Wait after sending a command, before the first read.
    pub settle: Duration,
    /// Wait between consecutive line reads while draining output.
    pub inter_read: Duration,
    /// Ceiling on waiting for the command echo. Converts a permanently
    /// silent device into [`ReplError::CommandTimeout`] instead of a hang.
    pub max_wait: Duration,
    /// Wait after a soft reboot (Ctrl-D).
    pub reboot_wait: Duration,
    /// Wait after an interrupt (Ctrl-C).
    pub interrupt_wait: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(100),
            inter_read: Duration::from_millis(100),
            max_wait: Duration::from_secs(5),
            reboot_wait: Duration::from_millis(250),
            interrupt_wait: Duration::from_millis(250),
        }
    }
}

/// A single line of remote code plus its execution parameters.
/// Constructed, sent, discarded.
#[derive(Debug, Clone)]
pub struct Command {
    text: String,
    settle: Option<Duration>,
    suppress_response: bool,
    capture_transcript: bool,
}

impl Command {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            settle: None,
            suppress_response: false,
            capture_transcript: false,
        }
    }

    /// Override the engine's default settle delay for this command.
    pub fn settle(mut self, delay: Duration) -> Self {
        self.settle = Some(delay);
        self
    }

    /// Don't collect a response; the input buffer is cleared instead.
    /// Used for uploads where the device doesn't echo anything worth
    /// parsing.
    pub fn fire_and_forget(mut self) -> Self {
        self.suppress_response = true;
        self
    }

    /// Retain the full filtered transcript for diagnostics.
    pub fn with_transcript(mut self) -> Self {
        self.capture_transcript = true;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// The accumulated, filtered text the remote side produced for one
/// command: echoed command line and prompt markers already removed.
#[derive(Debug, Default)]
pub struct Response {
    payload: String,
    transcript: Option<String>,
}

impl Response {
    fn empty() -> Self {
        Self::default()
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn transcript(&self) -> Option<&str> {
        self.transcript.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Drives the remote REPL: one command in flight at a time, ever.
pub struct Repl<C: Console> {
    pub(crate) console: C,
    timing: Timing,
}

impl<C: Console> Repl<C> {
    pub fn new(console: C, timing: Timing) -> Self {
        Self { console, timing }
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Send one command and reconstruct its response.
    ///
    /// Lines are classified in arrival order: *pre-echo* (noise before
    /// the command echo, discarded), *echo* (the command itself,
    /// optionally behind the prompt marker, discarded), and *payload*
    /// (everything after the echo that isn't a bare prompt). The input
    /// buffer is cleared afterwards so nothing leaks into the next call.
    pub fn execute(&mut self, cmd: &Command) -> Result<Response, ReplError> {
        let text = cmd.text.trim_end().to_string();
        trace!(command = %text, "executing");

        self.console.send(format!("{}\r\n", cmd.text).as_bytes())?;
        sleep(cmd.settle.unwrap_or(self.timing.settle));

        if cmd.suppress_response && !cmd.capture_transcript {
            self.console.clear_input()?;
            return Ok(Response::empty());
        }

        let started = Instant::now();
        let deadline = started + self.timing.max_wait;
        let mut payload: Vec<String> = Vec::new();
        let mut transcript: Vec<String> = Vec::new();
        let mut echo_seen = false;
        let echo_prompted = format!("{PROMPT} {text}");

        loop {
            while self.console.bytes_waiting()? > 0 {
                let line = self.console.read_line()?;
                let line = line.trim();

                if cmd.capture_transcript
                    && !line.is_empty()
                    && line != text
                    && line != PROMPT
                    && line != CONTINUATION
                {
                    transcript.push(line.to_string());
                }

                if !line.is_empty()
                    && (line.starts_with(&echo_prompted) || line.starts_with(text.as_str()))
                {
                    echo_seen = true;
                } else if !line.is_empty() && echo_seen && !line.starts_with(PROMPT) {
                    payload.push(line.to_string());
                }

                // Give the device time to produce more output before we
                // decide the buffer has gone quiet.
                sleep(self.timing.inter_read);
            }

            if echo_seen || cmd.suppress_response {
                break;
            }
            if Instant::now() >= deadline {
                self.console.clear_input()?;
                return Err(ReplError::CommandTimeout {
                    command: text,
                    waited_ms: started.elapsed().as_millis(),
                });
            }
            sleep(self.timing.inter_read);
        }

        self.console.clear_input()?;

        if !transcript.is_empty() {
            debug!(command = %text, transcript = %transcript.join("\n"), "repl transcript");
        }

        Ok(Response {
            payload: payload.join("\n").trim().to_string(),
            transcript: if cmd.capture_transcript {
                Some(transcript.join("\n"))
            } else {
                None
            },
        })
    }

    /// Soft-reboot the board (Ctrl-D), optionally waiting for it to come
    /// back up. Teardown skips the wait.
    pub fn soft_reboot(&mut self, wait: bool) -> Result<(), ReplError> {
        self.console.send(&[0x04])?;
        if wait {
            sleep(self.timing.reboot_wait);
        }
        Ok(())
    }

    /// Interrupt running code (Ctrl-C) so the prompt is idle.
    pub fn interrupt(&mut self) -> Result<(), ReplError> {
        self.console.send(&[0x03])?;
        sleep(self.timing.interrupt_wait);
        Ok(())
    }
}

fn sleep(d: Duration) {
    if !d.is_zero() {
        thread::sleep(d);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::ScriptedConsole;

    fn fast_timing() -> Timing {
        Timing {
            settle: Duration::ZERO,
            inter_read: Duration::ZERO,
            max_wait: Duration::from_millis(20),
            reboot_wait: Duration::ZERO,
            interrupt_wait: Duration::ZERO,
        }
    }

    fn repl(lines: &[&str]) -> Repl<ScriptedConsole> {
        Repl::new(ScriptedConsole::new(lines), fast_timing())
    }

    #[test]
    fn echo_and_prompt_are_stripped_from_payload() {
        let mut repl = repl(&[
            ">>> read_file('a.txt')",
            "b'hello'",
            ">>>",
        ]);
        let resp = repl.execute(&Command::new("read_file('a.txt')")).unwrap();
        assert_eq!(resp.payload(), "b'hello'");
    }

    #[test]
    fn pre_echo_noise_is_discarded() {
        let mut repl = repl(&[
            "some leftover output",
            "read_file('a.txt')",
            "b'data'",
        ]);
        let resp = repl.execute(&Command::new("read_file('a.txt')")).unwrap();
        assert_eq!(resp.payload(), "b'data'");
    }

    #[test]
    fn multi_line_payload_joined_in_order() {
        let mut repl = repl(&[
            ">>> list_files_recursively(\"\")",
            "[{'path': 'a',",
            "'type': 'file'}]",
            ">>>",
        ]);
        let resp = repl
            .execute(&Command::new("list_files_recursively(\"\")"))
            .unwrap();
        assert_eq!(resp.payload(), "[{'path': 'a',\n'type': 'file'}]");
    }

    #[test]
    fn empty_response_is_not_an_error() {
        // A successful void operation (e.g. delete) echoes the command
        // and produces nothing else.
        let mut repl = repl(&[">>> import os; os.remove('x')", ">>>"]);
        let resp = repl
            .execute(&Command::new("import os; os.remove('x')"))
            .unwrap();
        assert!(resp.is_empty());
    }

    #[test]
    fn fire_and_forget_clears_buffer_and_returns_empty() {
        let mut repl = repl(&["garbage", "more garbage"]);
        let resp = repl
            .execute(&Command::new("def f(): pass").fire_and_forget())
            .unwrap();
        assert!(resp.is_empty());
        assert_eq!(repl.console.cleared, 1);
        assert!(repl.console.lines.is_empty());
    }

    #[test]
    fn silent_device_times_out() {
        let mut repl = repl(&[]);
        let err = repl.execute(&Command::new("read_file('a')")).unwrap_err();
        match err {
            ReplError::CommandTimeout { command, .. } => {
                assert_eq!(command, "read_file('a')");
            }
            other => panic!("expected CommandTimeout, got {other:?}"),
        }
    }

    #[test]
    fn command_and_crlf_are_written_to_console() {
        let mut repl = repl(&[">>> 1+1", "2"]);
        repl.execute(&Command::new("1+1")).unwrap();
        assert_eq!(repl.console.sent[0], b"1+1\r\n");
    }

    #[test]
    fn buffer_cleared_after_collecting_response() {
        let mut repl = repl(&[">>> 1+1", "2"]);
        repl.execute(&Command::new("1+1")).unwrap();
        assert_eq!(repl.console.cleared, 1);
    }

    #[test]
    fn transcript_captures_payload_but_not_prompts() {
        let mut repl = repl(&[
            ">>> write_file('a', b'x')",
            "...",
            ">>>",
            "Traceback (most recent call last):",
        ]);
        let resp = repl
            .execute(&Command::new("write_file('a', b'x')").with_transcript())
            .unwrap();
        let transcript = resp.transcript().unwrap();
        assert!(transcript.contains("Traceback"));
        assert!(!transcript.contains("..."));
    }

    #[test]
    fn soft_reboot_and_interrupt_send_control_bytes() {
        let mut repl = repl(&[]);
        repl.soft_reboot(true).unwrap();
        repl.interrupt().unwrap();
        assert_eq!(repl.console.sent, vec![vec![0x04], vec![0x03]]);
    }
}
