//! Code-generation agents.
//!
//! An agent receives a prompt and a workspace and writes source files into
//! it. The harness only sees the agent's captured output; the files it
//! leaves behind are what gets built and graded.

pub mod claude;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::process::ExecResult;

pub use claude::ClaudeCodeAgent;

/// Capabilities the agent is allowed to use: file manipulation only, no shell.
pub const ALLOWED_TOOLS: &[&str] = &["Read", "Edit", "Write", "Glob", "Grep", "LSP"];

/// Instruction appended to every prompt; install and build belong to the harness.
pub const NO_PACKAGE_MANAGER_INSTRUCTION: &str =
    "Do not run npm, pnpm, yarn, or any package manager commands. Just write the code files.";

/// Appends the fixed safety instruction to a case prompt.
pub fn augment_prompt(prompt: &str) -> String {
    format!("{}\n\n{}", prompt, NO_PACKAGE_MANAGER_INSTRUCTION)
}

/// Everything an agent needs for one generation step.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    /// The case prompt, before augmentation.
    pub prompt: String,
    /// Workspace the agent works in.
    pub working_dir: PathBuf,
    /// Model identifier to request.
    pub model: String,
    /// Upper bound on the invocation.
    pub timeout: Duration,
    /// Disable skill-provided slash commands.
    pub baseline: bool,
    /// Emit diagnostics at info level.
    pub verbose: bool,
}

/// Outcome of one agent invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResult {
    /// Raw process outcome.
    #[serde(flatten)]
    pub exec: ExecResult,
    /// Model the agent reports having used.
    pub model_id: Option<String>,
    /// Final result text reported by the agent.
    pub result: Option<String>,
}

impl AgentResult {
    /// Wraps a process outcome, decoding the agent's structured response
    /// when the process succeeded.
    pub fn from_exec(exec: ExecResult) -> Self {
        if !exec.is_success() {
            return Self {
                exec,
                ..Self::default()
            };
        }
        let response = AgentResponse::parse(&exec.stdout);
        Self {
            exec,
            model_id: response.model_id,
            result: response.result,
        }
    }

    /// Text to report as the run output: the extracted result, falling
    /// back to raw stdout.
    pub fn output_text(&self) -> &str {
        match self.result.as_deref() {
            Some(text) if !text.is_empty() => text,
            _ => &self.exec.stdout,
        }
    }

    /// Checks if the agent exited with code 0.
    pub fn is_success(&self) -> bool {
        self.exec.is_success()
    }
}

/// Fields recovered from the agent's JSON output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentResponse {
    /// First key of the reported per-model usage map.
    pub model_id: Option<String>,
    /// Final result text.
    pub result: Option<String>,
}

impl AgentResponse {
    /// Best-effort decode of the agent's output.
    ///
    /// Output that is not JSON becomes the result text verbatim. Missing or
    /// mistyped fields are simply absent; decoding never fails.
    pub fn parse(raw: &str) -> Self {
        let value: serde_json::Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(_) => {
                return Self {
                    model_id: None,
                    result: Some(raw.to_string()),
                }
            }
        };

        let model_id = value
            .get("modelUsage")
            .and_then(|usage| usage.as_object())
            .and_then(|usage| usage.keys().next().cloned());
        let result = value
            .get("result")
            .and_then(|r| r.as_str())
            .map(str::to_string);

        Self { model_id, result }
    }
}

/// An external code-generation agent.
#[async_trait]
pub trait CodeAgent: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Runs the agent against the request's workspace.
    ///
    /// Failures of the agent process are reported in the result, never as
    /// an error.
    async fn generate(&self, request: &AgentRequest) -> AgentResult;
}
