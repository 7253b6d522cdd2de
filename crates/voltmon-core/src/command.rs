//! Subprocess execution with a hard timeout.
//!
//! Queries are always an explicit program plus argument list; nothing is
//! passed through a shell. Every failure mode (spawn error, non-zero exit,
//! timeout) collapses to empty output, which callers treat as "no new data".

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Default limit for a single query.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// How often a running child is checked for exit.
const POLL_STEP: Duration = Duration::from_millis(10);

/// Run `program args..` and return its stdout, or an empty string on any failure.
pub fn run_command(program: &str, args: &[&str]) -> String {
    run_command_with_timeout(program, args, DEFAULT_COMMAND_TIMEOUT)
}

/// Like [`run_command`] with an explicit timeout.
pub fn run_command_with_timeout(program: &str, args: &[&str], timeout: Duration) -> String {
    let start = Instant::now();
    match capture_stdout(program, args, timeout) {
        Ok(out) => {
            log::trace!(
                "{program} {args:?}: {} bytes in {}ms",
                out.len(),
                start.elapsed().as_millis()
            );
            out
        }
        Err(reason) => {
            log::debug!("{program} {args:?}: {reason}");
            String::new()
        }
    }
}

fn capture_stdout(program: &str, args: &[&str], timeout: Duration) -> Result<String, String> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| format!("spawn failed: {e}"))?;

    // Drain stdout concurrently so a chatty child cannot block on a full pipe.
    let mut stdout = child.stdout.take().ok_or("stdout not captured")?;
    let reader = thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stdout.read_to_end(&mut buf);
        buf
    });

    let deadline = start_deadline(timeout);
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    // The reader is detached; a grandchild may still hold the pipe.
                    log::warn!("{program} timed out after {}ms", timeout.as_millis());
                    return Err("timed out".into());
                }
                thread::sleep(POLL_STEP);
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(format!("wait failed: {e}"));
            }
        }
    };

    // The child has exited, but stdout stays open while any descendant holds it.
    while !reader.is_finished() {
        if Instant::now() >= deadline {
            log::warn!(
                "{program} exited but its stdout stayed open past {}ms",
                timeout.as_millis()
            );
            return Err("stdout held open by a descendant".into());
        }
        thread::sleep(POLL_STEP);
    }

    let buf = reader.join().map_err(|_| "stdout reader panicked")?;
    if !status.success() {
        return Err(format!("exited with {status}"));
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn start_deadline(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout).unwrap_or(now)
}
