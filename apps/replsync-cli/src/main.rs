//! # replsync
//!
//! Intuitive file management for MicroPython boards.
//!
//! Connect a board over USB serial, run `replsync -s /dev/ttyACM0`, and
//! edit files in the temporary directory it opens. The board's file
//! tree is pulled once at startup; every local change after that is
//! pushed back over the REPL automatically. Ctrl-C tears the session
//! down: the working directory is deleted and the board soft-rebooted
//! back into whatever it normally runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use replsync_console::serial::{DEFAULT_BAUD, DEFAULT_READ_TIMEOUT};
use replsync_console::SerialConsole;
use replsync_repl::{RemoteFs, Repl, Timing};
use replsync_sync::{ChangeEvent, Orchestrator, WorkDir};

/// Mirror a MicroPython board's filesystem and sync local edits back.
#[derive(Parser)]
#[command(name = "replsync", version, about)]
struct Cli {
    /// Serial port the board is attached to (e.g. COM1, /dev/ttyACM0).
    #[arg(short = 's', long, default_value = "COM1")]
    serial_port: String,

    /// Baud rate for the serial connection.
    #[arg(long, default_value_t = DEFAULT_BAUD)]
    baud: u32,

    /// Delay after sending a command before reading its output, in ms.
    /// Load-bearing: too short truncates responses.
    #[arg(long, default_value_t = 100)]
    settle_ms: u64,

    /// Delay between consecutive reads while draining output, in ms.
    #[arg(long, default_value_t = 100)]
    inter_read_ms: u64,

    /// Ceiling on waiting for a command echo before giving up, in ms.
    #[arg(long, default_value_t = 5000)]
    max_wait_ms: u64,

    /// Open the working directory in the OS file manager.
    #[arg(long)]
    explore: bool,

    /// Editor command to open on the working directory.
    #[arg(long, default_value = "code")]
    editor: String,

    /// Don't open an editor on the working directory.
    #[arg(long)]
    no_edit: bool,
}

impl Cli {
    fn timing(&self) -> Timing {
        Timing {
            settle: Duration::from_millis(self.settle_ms),
            inter_read: Duration::from_millis(self.inter_read_ms),
            max_wait: Duration::from_millis(self.max_wait_ms),
            ..Timing::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("replsync=info".parse()?)
                .add_directive("replsync_repl=info".parse()?)
                .add_directive("replsync_sync=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();

    // Cooperative cancellation: ctrl-c only flips the flag, and the
    // orchestrator loop runs its own teardown when it observes it.
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, shutting down");
                cancel.store(true, Ordering::Relaxed);
            }
        });
    }

    // Everything below is blocking serial + filesystem work; keep it
    // off the async runtime's core threads.
    tokio::task::spawn_blocking(move || run_session(cli, cancel))
        .await
        .context("session worker panicked")?
}

fn run_session(cli: Cli, cancel: Arc<AtomicBool>) -> Result<()> {
    info!(port = %cli.serial_port, baud = cli.baud, "connecting to board");
    let console = SerialConsole::open(&cli.serial_port, cli.baud, DEFAULT_READ_TIMEOUT)
        .context("failed to connect to the board")?;

    let mut repl = Repl::new(console, cli.timing());
    repl.bootstrap().context("failed to initialize the REPL")?;

    let remote = RemoteFs::new(repl);
    let workdir = WorkDir::create().context("failed to create working directory")?;
    info!(dir = %workdir.path().display(), "working directory created");

    open_tools(&cli, &workdir);

    let mut orchestrator = Orchestrator::new(remote, workdir);
    orchestrator
        .pull()
        .context("failed to pull files from the board")?;

    let events: Receiver<ChangeEvent> = orchestrator
        .start_watching()
        .context("failed to watch the working directory")?;

    // Blocks until cancelled; teardown (stop watcher, delete working
    // directory, reboot the board) runs inside on every exit path.
    orchestrator.run(events, cancel);
    Ok(())
}

/// Optional collaborators: file manager and editor on the working tree.
/// Their failure never affects the session.
fn open_tools(cli: &Cli, workdir: &WorkDir) {
    if cli.explore {
        if let Err(e) = open::that_detached(workdir.path()) {
            warn!(error = %e, "could not open file manager");
        }
    }
    if !cli.no_edit {
        if let Err(e) = open::with_detached(workdir.path(), &cli.editor) {
            warn!(editor = %cli.editor, error = %e, "could not open editor");
        }
    }
}
