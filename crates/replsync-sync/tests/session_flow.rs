// session_flow.rs — End-to-end session against a real filesystem watcher.
//
// Exercises the full steady-state path: a live notify watcher on the
// working directory feeding the orchestrator loop, with a recording
// remote standing in for the board. Uses generous polling deadlines —
// event delivery latency varies by platform backend.

use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use replsync_repl::{RemoteEntry, ReplError};
use replsync_sync::{Orchestrator, RemoteStore, WorkDir};

/// A thread-shareable recording remote: the test thread inspects calls
/// while the orchestrator loop runs.
#[derive(Clone, Default)]
struct SharedRemote {
    calls: Arc<Mutex<Vec<String>>>,
    reboots: Arc<Mutex<usize>>,
}

impl SharedRemote {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl RemoteStore for SharedRemote {
    fn list_all(&mut self, _with_contents: bool) -> Result<Vec<RemoteEntry>, ReplError> {
        Ok(Vec::new())
    }

    fn write_file(&mut self, path: &str, content: &[u8]) -> Result<(), ReplError> {
        self.record(format!(
            "write_file({path}, {})",
            String::from_utf8_lossy(content)
        ));
        Ok(())
    }

    fn delete_file(&mut self, path: &str) -> Result<(), ReplError> {
        self.record(format!("delete_file({path})"));
        Ok(())
    }

    fn create_dir(&mut self, path: &str) -> Result<(), ReplError> {
        self.record(format!("create_dir({path})"));
        Ok(())
    }

    fn delete_dir(&mut self, path: &str) -> Result<(), ReplError> {
        self.record(format!("delete_dir({path})"));
        Ok(())
    }

    fn soft_reboot(&mut self) -> Result<(), ReplError> {
        *self.reboots.lock().unwrap() += 1;
        Ok(())
    }
}

/// Poll until `pred` holds for the recorded calls, or fail after 5 s.
fn wait_for(remote: &SharedRemote, what: &str, pred: impl Fn(&[String]) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if pred(&remote.calls()) {
            return;
        }
        thread::sleep(Duration::from_millis(50));
    }
    panic!("timed out waiting for {what}; calls: {:?}", remote.calls());
}

#[test]
fn watched_session_pushes_local_changes_to_the_remote() {
    let remote = SharedRemote::default();
    let observer = remote.clone();

    let mut orch = Orchestrator::new(remote, WorkDir::create().unwrap());
    orch.pull().unwrap();
    let root = orch.local_root().to_path_buf();
    let rx = orch.start_watching().unwrap();

    let cancel = Arc::new(AtomicBool::new(false));
    let loop_cancel = cancel.clone();
    let worker = thread::spawn(move || orch.run(rx, loop_cancel));

    // Create a directory: expect create_dir, and no file write for it.
    fs::create_dir(root.join("src")).unwrap();
    wait_for(&observer, "create_dir(src)", |calls| {
        calls.iter().any(|c| c == "create_dir(src)")
    });
    assert!(!observer.calls().iter().any(|c| c.starts_with("write_file")));

    // Create a file inside it: expect its content pushed.
    fs::write(root.join("src/app.py"), "print('hi')").unwrap();
    wait_for(&observer, "write of src/app.py", |calls| {
        calls
            .iter()
            .any(|c| c == "write_file(src/app.py, print('hi'))")
    });

    // Delete the file: the snapshot classifies it as a file.
    fs::remove_file(root.join("src/app.py")).unwrap();
    wait_for(&observer, "delete_file(src/app.py)", |calls| {
        calls.iter().any(|c| c == "delete_file(src/app.py)")
    });
    assert!(!observer.calls().iter().any(|c| c.starts_with("delete_dir")));

    cancel.store(true, Ordering::Relaxed);
    worker.join().unwrap();

    // Teardown ran exactly once and removed the working tree.
    assert_eq!(*observer.reboots.lock().unwrap(), 1);
    assert!(!root.exists());
}
