// remote_fs.rs — High-level filesystem operations on the board.
//
// Each operation normalizes path separators to forward slashes (the
// board treats a backslash as part of the filename, not a separator),
// composes one command string against the bootstrapped procedures, and
// makes exactly one engine call. Nothing here retries: a malformed or
// missing response surfaces as an error and the operation is unapplied.

use replsync_console::Console;
use tracing::debug;

use crate::engine::{Command, Repl};
use crate::error::ReplError;
use crate::literal;

/// What a remote directory entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One record from the recursive listing: path relative to the remote
/// root, forward-slash separators unconditionally.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEntry {
    pub path: String,
    pub kind: EntryKind,
    /// Present only for files listed with `with_contents`.
    pub contents: Option<Vec<u8>>,
}

/// The remote filesystem facade over a bootstrapped [`Repl`].
pub struct RemoteFs<C: Console> {
    repl: Repl<C>,
}

impl<C: Console> RemoteFs<C> {
    pub fn new(repl: Repl<C>) -> Self {
        Self { repl }
    }

    pub fn repl_mut(&mut self) -> &mut Repl<C> {
        &mut self.repl
    }

    /// Recursively list files and directories under `dir` ("" for the
    /// whole filesystem), optionally with file contents.
    pub fn list_recursive(
        &mut self,
        dir: &str,
        with_contents: bool,
    ) -> Result<Vec<RemoteEntry>, ReplError> {
        let dir = normalize(dir);
        let get_contents = if with_contents { "True" } else { "False" };
        let cmd = Command::new(format!(
            "list_files_recursively(\"{dir}\", get_contents={get_contents})"
        ));
        let response = self.repl.execute(&cmd)?;
        let text = response.payload();

        if !(text.starts_with('[') && text.ends_with(']')) {
            return Err(ReplError::UnexpectedResponse {
                operation: "list_files_recursively",
                response: clip(text),
            });
        }
        literal::parse_entries(text)
    }

    /// Read one file's raw bytes.
    pub fn read_file(&mut self, path: &str) -> Result<Vec<u8>, ReplError> {
        let path = normalize(path);
        let response = self.repl.execute(&Command::new(format!("read_file('{path}')")))?;
        let text = response.payload();

        if !(text.starts_with("b'") || text.starts_with("b\"")) {
            return Err(ReplError::UnexpectedResponse {
                operation: "read_file",
                response: clip(text),
            });
        }
        literal::unescape_bytes(text)
    }

    /// Write a file, creating its parent directories first. One round
    /// trip: the mkdir is idempotent on the remote side, so the combined
    /// command is safe whether or not the parents already exist.
    pub fn write_file(&mut self, path: &str, content: &[u8]) -> Result<(), ReplError> {
        let path = normalize(path);
        let parent = parent_dir(&path);
        let escaped = literal::escape_bytes(content);
        debug!(path = %path, bytes = content.len(), "writing remote file");

        let cmd = Command::new(format!(
            "mkdir_recursive('{parent}'); write_file('{path}', {escaped})"
        ))
        .with_transcript();
        self.repl.execute(&cmd)?;
        Ok(())
    }

    /// Delete one file. An empty response is the success case.
    pub fn delete_file(&mut self, path: &str) -> Result<(), ReplError> {
        let path = normalize(path);
        debug!(path = %path, "deleting remote file");
        self.repl
            .execute(&Command::new(format!("import os; os.remove('{path}')")))?;
        Ok(())
    }

    /// Create a directory, including missing parents. Idempotent.
    pub fn create_dir(&mut self, path: &str) -> Result<(), ReplError> {
        let path = normalize(path);
        debug!(path = %path, "creating remote directory");
        self.repl
            .execute(&Command::new(format!("mkdir_recursive('{path}')")))?;
        Ok(())
    }

    /// Delete a directory and everything under it.
    pub fn delete_dir(&mut self, path: &str) -> Result<(), ReplError> {
        let path = normalize(path);
        debug!(path = %path, "deleting remote directory");
        self.repl
            .execute(&Command::new(format!("rmdir_recursive('{path}')")))?;
        Ok(())
    }

    /// Raw `os.stat` tuple text for a remote path. Diagnostic helper;
    /// the tuple is not parsed.
    pub fn stat(&mut self, path: &str) -> Result<String, ReplError> {
        let path = normalize(path);
        let response = self
            .repl
            .execute(&Command::new(format!("import os; os.stat('{path}')")))?;
        Ok(response.payload().to_string())
    }

    /// Soft-reboot the board without waiting. Used at teardown to
    /// restore whatever the board normally runs.
    pub fn soft_reboot(&mut self) -> Result<(), ReplError> {
        self.repl.soft_reboot(false)
    }
}

/// Replace host path separators with the forward slashes the board
/// expects.
fn normalize(path: &str) -> String {
    path.replace('\\', "/")
}

/// Text before the final separator, "" for root-level paths.
fn parent_dir(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some((parent, _)) => parent,
        None => "",
    }
}

/// Keep error messages readable when the response is an entire file
/// listing.
fn clip(text: &str) -> String {
    const LIMIT: usize = 120;
    if text.len() <= LIMIT {
        text.to_string()
    } else {
        let cut = (0..=LIMIT).rev().find(|&i| text.is_char_boundary(i)).unwrap_or(0);
        format!("{}…", &text[..cut])
    }
}
