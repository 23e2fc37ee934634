// remote.rs — The orchestrator's seam to the board.
//
// Generic so the sync logic tests against a recording fake instead of
// serial hardware. The real implementation is the RemoteFs facade.

use replsync_console::Console;
use replsync_repl::{RemoteEntry, RemoteFs, ReplError};

/// Everything the sync engine needs from the remote side.
pub trait RemoteStore {
    /// Recursive listing of the whole remote tree, optionally with file
    /// contents (the one-time pull requests them).
    fn list_all(&mut self, with_contents: bool) -> Result<Vec<RemoteEntry>, ReplError>;

    fn write_file(&mut self, path: &str, content: &[u8]) -> Result<(), ReplError>;

    fn delete_file(&mut self, path: &str) -> Result<(), ReplError>;

    fn create_dir(&mut self, path: &str) -> Result<(), ReplError>;

    fn delete_dir(&mut self, path: &str) -> Result<(), ReplError>;

    /// Restore the board to whatever it normally runs. Teardown only.
    fn soft_reboot(&mut self) -> Result<(), ReplError>;
}

impl<C: Console> RemoteStore for RemoteFs<C> {
    fn list_all(&mut self, with_contents: bool) -> Result<Vec<RemoteEntry>, ReplError> {
        self.list_recursive("", with_contents)
    }

    fn write_file(&mut self, path: &str, content: &[u8]) -> Result<(), ReplError> {
        RemoteFs::write_file(self, path, content)
    }

    fn delete_file(&mut self, path: &str) -> Result<(), ReplError> {
        RemoteFs::delete_file(self, path)
    }

    fn create_dir(&mut self, path: &str) -> Result<(), ReplError> {
        RemoteFs::create_dir(self, path)
    }

    fn delete_dir(&mut self, path: &str) -> Result<(), ReplError> {
        RemoteFs::delete_dir(self, path)
    }

    fn soft_reboot(&mut self) -> Result<(), ReplError> {
        RemoteFs::soft_reboot(self)
    }
}
