//! Timeout-bounded execution of external tools.

use std::fs::File;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use crate::error::SynthesisError;

const POLL_INTERVAL: Duration = Duration::from_millis(25);
const MAX_DIAGNOSTIC_BYTES: usize = 4096;

/// Outcome of a tool that exited on its own.
#[derive(Debug)]
pub(crate) struct ToolOutput {
    pub status: ExitStatus,
    pub stderr: String,
}

/// Runs `command` to completion or kills it once `timeout` elapses.
///
/// Stdout is discarded and stderr is captured into a file under `scratch`,
/// so a chatty tool cannot block on a full pipe while we poll it.
pub(crate) fn run_with_timeout(
    mut command: Command,
    tool: &str,
    timeout: Duration,
    scratch: &Path,
) -> Result<ToolOutput, SynthesisError> {
    let stderr_path = scratch.join(format!("{tool}.stderr"));
    let stderr_file = File::create(&stderr_path)?;
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::from(stderr_file));

    debug!(tool, ?command, "spawning external tool");
    let start = Instant::now();
    let mut child = command.spawn().map_err(|err| SynthesisError::ToolFailed {
        tool: tool.to_string(),
        status: "not started".to_string(),
        diagnostic: err.to_string(),
    })?;

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if start.elapsed() > timeout {
            stop(&mut child, tool);
            error!(tool, ?timeout, "external tool timed out");
            return Err(SynthesisError::ToolTimedOut {
                tool: tool.to_string(),
                timeout,
            });
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    let stderr = std::fs::read(&stderr_path)?;
    debug!(
        tool,
        elapsed_ms = start.elapsed().as_millis() as u64,
        %status,
        "external tool finished"
    );
    Ok(ToolOutput {
        status,
        stderr: tail_lossy(&stderr, MAX_DIAGNOSTIC_BYTES),
    })
}

/// Kills and reaps a child that overran its deadline. Failures are logged;
/// the caller reports the timeout either way.
fn stop(child: &mut Child, tool: &str) {
    if let Err(err) = child.kill() {
        warn!(tool, pid = child.id(), %err, "failed to kill external tool");
    }
    if let Err(err) = child.wait() {
        warn!(tool, pid = child.id(), %err, "failed to reap external tool");
    }
}

/// Last `max` bytes of `bytes` as text, trimmed.
fn tail_lossy(bytes: &[u8], max: usize) -> String {
    let start = bytes.len().saturating_sub(max);
    String::from_utf8_lossy(&bytes[start..]).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_keeps_the_end_of_long_output() {
        assert_eq!(tail_lossy(b"  short\n", 100), "short");
        assert_eq!(tail_lossy(b"0123456789", 4), "6789");
    }

    #[cfg(unix)]
    #[test]
    fn captures_status_and_stderr() {
        let scratch = tempfile::tempdir().expect("tempdir");
        let mut command = Command::new("sh");
        command.args(["-c", "echo broken network >&2; exit 3"]);
        let output = run_with_timeout(command, "netcheck", Duration::from_secs(10), scratch.path())
            .expect("tool should run");
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(output.stderr, "broken network");
    }

    #[cfg(unix)]
    #[test]
    fn kills_tool_after_timeout() {
        let scratch = tempfile::tempdir().expect("tempdir");
        let mut command = Command::new("sh");
        command.args(["-c", "sleep 5"]);
        let timeout = Duration::from_millis(200);
        let started = Instant::now();
        let err = run_with_timeout(command, "sleeper", timeout, scratch.path())
            .expect_err("tool should time out");
        assert!(matches!(err, SynthesisError::ToolTimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn stop_leaves_no_running_child() {
        let mut child = Command::new("sh")
            .args(["-c", "sleep 5"])
            .spawn()
            .expect("spawn");
        stop(&mut child, "sleeper");
        let status = child.try_wait().expect("status").expect("child reaped");
        assert!(!status.success());
        // A second stop on a reaped child only logs.
        stop(&mut child, "sleeper");
    }

    #[test]
    fn missing_binary_is_a_tool_failure() {
        let scratch = tempfile::tempdir().expect("tempdir");
        let command = Command::new("definitely-not-a-real-binary-4711");
        let err = run_with_timeout(command, "ghost", Duration::from_secs(1), scratch.path())
            .expect_err("spawn should fail");
        assert!(matches!(err, SynthesisError::ToolFailed { .. }));
    }
}
