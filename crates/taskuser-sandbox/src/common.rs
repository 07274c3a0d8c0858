//! Common utilities for running host tools
//!
//! Process monitoring with a wall-clock bound, shared by every external tool
//! call (reaping, provisioning, task launch).

use std::io::{ErrorKind, Read};
use std::process::Child;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::ToolError;
use crate::host::ToolOutput;

/// Poll interval while waiting for a child to exit
pub const POLL_INTERVAL_MS: u64 = 100;

const READ_CHUNK: usize = 8192;

/// Wait for child process with timeout
///
/// Reads stdout/stderr in background threads while the process runs.
/// Without this, a child writing more than the pipe buffer (~64KB) would block
/// on write, and we'd deadlock waiting for it to exit.
///
/// The whole call, including draining the pipes after the child exits, is
/// bounded by `timeout`. A background process that inherited the pipes can
/// keep them open after the child is gone; its output past the deadline is
/// dropped and the child's exit status is returned with what was collected.
///
/// On timeout the child is killed and reaped before `ToolError::Timeout` is
/// returned, so no zombie outlives the call.
pub fn wait_with_timeout(
    child: &mut Child,
    program: &str,
    timeout: Duration,
) -> Result<ToolOutput, ToolError> {
    let start = Instant::now();
    let deadline = start + timeout;
    let check_interval = Duration::from_millis(POLL_INTERVAL_MS);

    let stdout_rx = child.stdout.take().map(spawn_reader);
    let stderr_rx = child.stderr.take().map(spawn_reader);

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let (stdout, stdout_done) = drain_until(stdout_rx, deadline);
                let (stderr, stderr_done) = drain_until(stderr_rx, deadline);
                if !(stdout_done && stderr_done) {
                    tracing::warn!(
                        "'{}' exited but its output pipes were still open after {} seconds; output may be truncated",
                        program,
                        timeout.as_secs()
                    );
                }
                return Ok(ToolOutput {
                    stdout,
                    stderr,
                    exit_code: status.code().unwrap_or(-1),
                });
            }
            Ok(None) => {}
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ToolError::Wait {
                    program: program.to_string(),
                    source: e,
                });
            }
        }

        if start.elapsed() > timeout {
            let _ = child.kill();
            let _ = child.wait();
            // Readers are detached: a grandchild may still hold the pipes.
            return Err(ToolError::Timeout {
                program: program.to_string(),
                secs: timeout.as_secs(),
            });
        }

        thread::sleep(check_interval);
    }
}

/// Forward a pipe's bytes chunk by chunk. The channel closes at EOF.
fn spawn_reader<R: Read + Send + 'static>(mut stream: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(chunk[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
    });
    rx
}

/// Collect a reader's output until EOF or `deadline`. The flag is false if
/// the deadline came first.
fn drain_until(rx: Option<Receiver<Vec<u8>>>, deadline: Instant) -> (String, bool) {
    let Some(rx) = rx else {
        return (String::new(), true);
    };
    let mut buf = Vec::new();
    let complete = loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            // Keep whatever is already queued.
            for bytes in rx.try_iter() {
                buf.extend_from_slice(&bytes);
            }
            break false;
        }
        match rx.recv_timeout(remaining) {
            Ok(bytes) => buf.extend_from_slice(&bytes),
            Err(RecvTimeoutError::Disconnected) => break true,
            Err(RecvTimeoutError::Timeout) => {}
        }
    };
    (String::from_utf8_lossy(&buf).into_owned(), complete)
}
