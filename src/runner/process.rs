//! External process execution with output capture and a hard deadline.
//!
//! Every tool the harness drives (package manager, build, test runner,
//! skill fetcher, agent CLI) goes through [`exec_command`]. The function
//! never fails: spawn errors, non-zero exits and timeouts all come back
//! as an [`ExecResult`].

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Exit code reported for spawn failures, timeouts and signal deaths.
pub const FAILURE_EXIT_CODE: i32 = 1;

/// Captured outcome of one external process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecResult {
    /// Standard output text.
    pub stdout: String,
    /// Standard error text.
    pub stderr: String,
    /// Process exit code.
    pub exit_code: i32,
    /// Whether the deadline fired and the process was killed.
    #[serde(default)]
    pub timed_out: bool,
}

impl ExecResult {
    /// Result used when the process could not be started at all.
    pub fn spawn_failure() -> Self {
        Self {
            exit_code: FAILURE_EXIT_CODE,
            ..Self::default()
        }
    }

    /// Checks if the process exited with code 0.
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// A shell command to run in a working directory.
#[derive(Debug, Clone)]
pub struct ExecRequest {
    /// Shell command string.
    pub command: String,
    /// Working directory.
    pub cwd: PathBuf,
    /// Hard deadline; `None` waits for the process indefinitely.
    pub timeout: Option<Duration>,
}

impl ExecRequest {
    /// Creates a request without a deadline.
    pub fn new(command: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            cwd: cwd.into(),
            timeout: None,
        }
    }

    /// Sets the deadline.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Builds the platform shell invocation for `command`.
fn shell_command(command: &str, cwd: &Path) -> Command {
    #[cfg(windows)]
    let mut cmd = {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    };
    #[cfg(not(windows))]
    let mut cmd = {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    };

    cmd.current_dir(cwd)
        .env("CI", "true")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

/// Runs a shell command, capturing stdout and stderr.
///
/// The child inherits the current environment with `CI=true` forced so
/// tools stay non-interactive. When the deadline elapses the child is
/// killed and the result carries exit code 1 plus whatever output had
/// been read so far.
pub async fn exec_command(request: &ExecRequest) -> ExecResult {
    let start = Instant::now();
    debug!(command = %request.command, cwd = %request.cwd.display(), "Spawning command");

    let mut child = match shell_command(&request.command, &request.cwd).spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!(command = %request.command, error = %e, "Failed to spawn command");
            return ExecResult::spawn_failure();
        }
    };

    let (Some(mut stdout), Some(mut stderr)) = (child.stdout.take(), child.stderr.take()) else {
        warn!(command = %request.command, "Child output was not captured");
        let _ = child.kill().await;
        return ExecResult::spawn_failure();
    };

    let mut stdout_buf = Vec::new();
    let mut stderr_buf = Vec::new();

    // read_to_end appends as it reads, so the buffers keep partial output
    // if the deadline drops this future mid-read.
    let collect = async {
        let (out, err) = tokio::join!(
            stdout.read_to_end(&mut stdout_buf),
            stderr.read_to_end(&mut stderr_buf)
        );
        if let Err(e) = out {
            warn!(error = %e, "Error reading stdout");
        }
        if let Err(e) = err {
            warn!(error = %e, "Error reading stderr");
        }
        child.wait().await
    };

    let outcome = match request.timeout {
        Some(limit) => tokio::time::timeout(limit, collect).await.ok(),
        None => Some(collect.await),
    };

    let (exit_code, timed_out) = match outcome {
        Some(Ok(status)) => (status.code().unwrap_or(FAILURE_EXIT_CODE), false),
        Some(Err(e)) => {
            warn!(command = %request.command, error = %e, "Failed to wait for command");
            (FAILURE_EXIT_CODE, false)
        }
        None => {
            warn!(
                command = %request.command,
                timeout_secs = request.timeout.map(|t| t.as_secs_f64()).unwrap_or_default(),
                "Command timed out, killing process"
            );
            if let Err(e) = child.kill().await {
                debug!(error = %e, "Kill after timeout failed (process may have exited)");
            }
            (FAILURE_EXIT_CODE, true)
        }
    };

    let result = ExecResult {
        stdout: String::from_utf8_lossy(&stdout_buf).into_owned(),
        stderr: String::from_utf8_lossy(&stderr_buf).into_owned(),
        exit_code,
        timed_out,
    };

    debug!(
        command = %request.command,
        exit_code = result.exit_code,
        duration_ms = start.elapsed().as_millis() as u64,
        "Command finished"
    );
    result
}

/// Truncates text for log output, respecting char boundaries.
pub fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) && end > 0 {
            end -= 1;
        }
        format!("{}... [truncated]", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_output_and_exit_code() {
        let temp = TempDir::new().unwrap();
        let request = ExecRequest::new("echo out; echo err >&2; exit 3", temp.path());

        let result = exec_command(&request).await;
        assert_eq!(result.stdout, "out\n");
        assert_eq!(result.stderr, "err\n");
        assert_eq!(result.exit_code, 3);
        assert!(!result.is_success());
        assert!(!result.timed_out);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_in_working_directory() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("marker.txt"), "here").unwrap();

        let result = exec_command(&ExecRequest::new("cat marker.txt", temp.path())).await;
        assert!(result.is_success());
        assert_eq!(result.stdout, "here");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sets_ci_flag() {
        let temp = TempDir::new().unwrap();
        let result = exec_command(&ExecRequest::new("printf %s \"$CI\"", temp.path())).await;
        assert_eq!(result.stdout, "true");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_process() {
        let temp = TempDir::new().unwrap();
        let request = ExecRequest::new("echo started; exec sleep 30", temp.path())
            .with_timeout(Some(Duration::from_millis(300)));

        let start = Instant::now();
        let result = exec_command(&request).await;

        assert!(start.elapsed() < Duration::from_secs(10));
        assert_eq!(result.exit_code, 1);
        assert!(result.timed_out);
        assert_eq!(result.stdout, "started\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fast_command_within_timeout() {
        let temp = TempDir::new().unwrap();
        let request =
            ExecRequest::new("echo fast", temp.path()).with_timeout(Some(Duration::from_secs(10)));

        let result = exec_command(&request).await;
        assert!(result.is_success());
        assert!(!result.timed_out);
        assert_eq!(result.stdout, "fast\n");
    }

    #[tokio::test]
    async fn test_missing_working_directory_is_spawn_failure() {
        let request = ExecRequest::new("echo hi", "/nonexistent/dir/for/skill-evals");
        let result = exec_command(&request).await;
        assert_eq!(result, ExecResult::spawn_failure());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc... [truncated]");
        assert_eq!(truncate("héllo", 2), "h... [truncated]");
    }
}
