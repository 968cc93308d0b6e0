//! Claude Code CLI adapter.
//!
//! The agent runs in print mode with JSON output and a file-only tool
//! allow-list. The prompt travels through a file in the workspace so that
//! arbitrary prompt text never has to survive shell quoting.

use std::fs;
use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{augment_prompt, AgentRequest, AgentResult, CodeAgent, ALLOWED_TOOLS};
use crate::runner::process::{exec_command, truncate, ExecRequest, ExecResult};

/// Transient prompt file written into the workspace.
pub const PROMPT_FILE: &str = ".eval-prompt.txt";

/// Adapter for the `claude` CLI.
#[derive(Debug, Clone)]
pub struct ClaudeCodeAgent {
    /// Executable to invoke.
    binary: String,
}

impl ClaudeCodeAgent {
    /// Creates an adapter invoking `claude` from `PATH`.
    pub fn new() -> Self {
        Self::with_binary("claude")
    }

    /// Creates an adapter invoking a specific executable.
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Flags for a restricted, non-interactive invocation.
    pub fn build_args(&self, model: &str, baseline: bool) -> Vec<String> {
        let mut args = vec![
            shell_words::quote(&self.binary).into_owned(),
            "--print".to_string(),
            "--model".to_string(),
            shell_words::quote(model).into_owned(),
            "--output-format".to_string(),
            "json".to_string(),
            "--allowedTools".to_string(),
            ALLOWED_TOOLS.join(","),
            "--dangerously-skip-permissions".to_string(),
            "--no-session-persistence".to_string(),
        ];

        if baseline {
            args.push("--disable-slash-commands".to_string());
        }

        args
    }

    /// Full shell command reading the prompt from `prompt_file`.
    pub fn build_command(&self, model: &str, baseline: bool, prompt_file: &Path) -> String {
        format!(
            "{} \"$(cat {})\"",
            self.build_args(model, baseline).join(" "),
            shell_words::quote(&prompt_file.to_string_lossy())
        )
    }
}

impl Default for ClaudeCodeAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CodeAgent for ClaudeCodeAgent {
    fn name(&self) -> &str {
        "claude-code"
    }

    async fn generate(&self, request: &AgentRequest) -> AgentResult {
        let prompt_file = request.working_dir.join(PROMPT_FILE);
        if let Err(e) = fs::write(&prompt_file, augment_prompt(&request.prompt)) {
            warn!(path = %prompt_file.display(), error = %e, "Failed to write prompt file");
            return AgentResult::from_exec(ExecResult {
                stderr: format!("failed to write prompt file: {}", e),
                ..ExecResult::spawn_failure()
            });
        }

        let command = self.build_command(&request.model, request.baseline, &prompt_file);
        let shown = format!(
            "{} \"<prompt from file>\"",
            self.build_args(&request.model, request.baseline).join(" ")
        );
        if request.verbose {
            info!(command = %shown, "Running agent");
        } else {
            debug!(command = %shown, "Running agent");
        }

        let exec = exec_command(
            &ExecRequest::new(command, &request.working_dir).with_timeout(Some(request.timeout)),
        )
        .await;

        if let Err(e) = fs::remove_file(&prompt_file) {
            debug!(path = %prompt_file.display(), error = %e, "Prompt file cleanup skipped");
        }

        let result = AgentResult::from_exec(exec);
        if request.verbose {
            info!(
                exit_code = result.exec.exit_code,
                timed_out = result.exec.timed_out,
                model_id = result.model_id.as_deref().unwrap_or("unknown"),
                "Agent finished: {}",
                truncate(result.output_text(), 200)
            );
            if !result.is_success() && !result.exec.stderr.is_empty() {
                info!("Agent stderr: {}", truncate(&result.exec.stderr, 500));
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    fn request(dir: &Path, timeout: Duration, baseline: bool) -> AgentRequest {
        AgentRequest {
            prompt: "Add a counter that says \"hi\" and $HOME isn't expanded".to_string(),
            working_dir: dir.to_path_buf(),
            model: "sonnet".to_string(),
            timeout,
            baseline,
            verbose: false,
        }
    }

    #[cfg(unix)]
    fn fake_agent(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-claude");
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_build_args() {
        let agent = ClaudeCodeAgent::new();
        let args = agent.build_args("opus", false);

        assert_eq!(args[0], "claude");
        assert!(args.windows(2).any(|w| w == ["--model", "opus"]));
        assert!(args.windows(2).any(|w| w == ["--output-format", "json"]));
        assert!(args
            .windows(2)
            .any(|w| w == ["--allowedTools", "Read,Edit,Write,Glob,Grep,LSP"]));
        assert!(!args.contains(&"--disable-slash-commands".to_string()));

        let args = agent.build_args("opus", true);
        assert!(args.contains(&"--disable-slash-commands".to_string()));
    }

    #[test]
    fn test_build_command_reads_prompt_file() {
        let agent = ClaudeCodeAgent::new();
        let command = agent.build_command("sonnet", false, Path::new("/tmp/ws/.eval-prompt.txt"));
        assert!(command.starts_with("claude --print --model sonnet"));
        assert!(command.ends_with("\"$(cat /tmp/ws/.eval-prompt.txt)\""));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_generate_parses_json_response() {
        let bin = TempDir::new().unwrap();
        let workspace = TempDir::new().unwrap();
        let script = fake_agent(
            bin.path(),
            r#"for arg in "$@"; do printf '%s\n' "$arg"; done > args.txt
printf '{"result":"wrote Counter.vue","modelUsage":{"claude-sonnet-test":{}}}'"#,
        );

        let agent = ClaudeCodeAgent::with_binary(script.to_string_lossy());
        let result = agent
            .generate(&request(workspace.path(), Duration::from_secs(30), true))
            .await;

        assert!(result.is_success());
        assert_eq!(result.model_id.as_deref(), Some("claude-sonnet-test"));
        assert_eq!(result.result.as_deref(), Some("wrote Counter.vue"));
        assert!(!workspace.path().join(PROMPT_FILE).exists());

        let args = fs::read_to_string(workspace.path().join("args.txt")).unwrap();
        assert!(args.contains("--disable-slash-commands"));
        assert!(args.contains("Add a counter that says \"hi\" and $HOME isn't expanded"));
        assert!(args.contains(super::super::NO_PACKAGE_MANAGER_INSTRUCTION));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_generate_plain_text_output() {
        let bin = TempDir::new().unwrap();
        let workspace = TempDir::new().unwrap();
        let script = fake_agent(bin.path(), "echo 'not json at all'");

        let agent = ClaudeCodeAgent::with_binary(script.to_string_lossy());
        let result = agent
            .generate(&request(workspace.path(), Duration::from_secs(30), false))
            .await;

        assert!(result.is_success());
        assert_eq!(result.model_id, None);
        assert_eq!(result.output_text(), "not json at all\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_generate_timeout() {
        let bin = TempDir::new().unwrap();
        let workspace = TempDir::new().unwrap();
        let script = fake_agent(bin.path(), "exec sleep 30");

        let agent = ClaudeCodeAgent::with_binary(script.to_string_lossy());
        let result = agent
            .generate(&request(workspace.path(), Duration::from_millis(300), false))
            .await;

        assert_eq!(result.exec.exit_code, 1);
        assert!(result.exec.timed_out);
        assert_eq!(result.result, None);
        assert!(!workspace.path().join(PROMPT_FILE).exists());
    }

    #[tokio::test]
    async fn test_generate_missing_workspace() {
        let agent = ClaudeCodeAgent::new();
        let result = agent
            .generate(&request(
                Path::new("/nonexistent/skill-evals/workspace"),
                Duration::from_secs(1),
                false,
            ))
            .await;

        assert_eq!(result.exec.exit_code, 1);
        assert!(result.exec.stderr.contains("prompt file"));
    }
}
