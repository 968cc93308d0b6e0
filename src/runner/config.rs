//! Configuration for evaluation runs.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EvalError;

/// Name of the per-case configuration file holding the prompt.
pub const EVAL_CONFIG_FILE: &str = "eval.json";

/// Default model passed to the agent.
pub const DEFAULT_MODEL: &str = "sonnet";

/// Per-run options. Immutable for the duration of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOptions {
    /// Model identifier requested from the agent.
    pub model: String,
    /// Skill to install into the workspace before generation.
    pub skill: Option<String>,
    /// Upper bound on the agent invocation.
    pub timeout: Duration,
    /// Disable skill augmentation so the run measures the bare agent.
    pub baseline: bool,
    /// Keep the workspace and emit diagnostics.
    pub verbose: bool,
}

impl RunOptions {
    /// Creates options for the given model with defaults.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            skill: None,
            timeout: Duration::from_secs(600),
            baseline: false,
            verbose: false,
        }
    }

    /// Sets the skill to install.
    pub fn with_skill(mut self, skill: impl Into<String>) -> Self {
        self.skill = Some(skill.into());
        self
    }

    /// Sets the agent timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Marks this run as a baseline run.
    pub fn baseline(mut self, baseline: bool) -> Self {
        self.baseline = baseline;
        self
    }

    /// Enables verbose diagnostics and workspace retention.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL)
    }
}

/// Command shapes for the external tools the harness drives.
///
/// Every command is a shell command string run inside the workspace.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Dependency installation.
    pub install_command: String,
    /// Project build.
    pub build_command: String,
    /// Oracle test run; must pick up the generated test-runner config.
    pub test_command: String,
    /// Package the skill is fetched from.
    pub skill_source: String,
    /// Skill installer; `{source}` and `{skill}` are substituted, shell-quoted.
    pub skill_command: String,
    /// Directory inside the workspace that skills are installed under.
    pub skill_root: String,
    /// Agent CLI executable.
    pub agent_binary: String,
    /// Optional bound on install, build, test and skill steps.
    pub command_timeout: Option<Duration>,
    /// Parent directory for workspaces (system temp dir when unset).
    pub work_root: Option<PathBuf>,
}

impl HarnessConfig {
    /// Sets the dependency installation command.
    pub fn with_install_command(mut self, cmd: impl Into<String>) -> Self {
        self.install_command = cmd.into();
        self
    }

    /// Sets the build command.
    pub fn with_build_command(mut self, cmd: impl Into<String>) -> Self {
        self.build_command = cmd.into();
        self
    }

    /// Sets the test command.
    pub fn with_test_command(mut self, cmd: impl Into<String>) -> Self {
        self.test_command = cmd.into();
        self
    }

    /// Sets the package skills are fetched from.
    pub fn with_skill_source(mut self, source: impl Into<String>) -> Self {
        self.skill_source = source.into();
        self
    }

    /// Sets the skill installer template.
    pub fn with_skill_command(mut self, template: impl Into<String>) -> Self {
        self.skill_command = template.into();
        self
    }

    /// Sets the agent executable.
    pub fn with_agent_binary(mut self, binary: impl Into<String>) -> Self {
        self.agent_binary = binary.into();
        self
    }

    /// Bounds install, build, test and skill steps.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    /// Sets the parent directory for workspaces.
    pub fn with_work_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_root = Some(dir.into());
        self
    }

    /// Builds the skill installation command for `skill`.
    pub fn skill_install_command(&self, skill: &str) -> String {
        self.skill_command
            .replace("{source}", &shell_words::quote(&self.skill_source))
            .replace("{skill}", &shell_words::quote(skill))
    }

    /// Resolves the directory workspaces are created under.
    pub fn work_root(&self) -> PathBuf {
        self.work_root.clone().unwrap_or_else(std::env::temp_dir)
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            install_command: "pnpm install".to_string(),
            build_command: "pnpm run build".to_string(),
            test_command: "pnpm exec vitest run -c vitest.eval.config.ts --reporter=verbose"
                .to_string(),
            skill_source: "vuejs-ai/skills".to_string(),
            skill_command: "npx skills add {source} --skill {skill} -y --copy".to_string(),
            skill_root: ".claude".to_string(),
            agent_binary: "claude".to_string(),
            command_timeout: None,
            work_root: None,
        }
    }
}

/// Contents of a case's `eval.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Natural-language prompt handed to the agent.
    pub query: String,
}

impl EvalConfig {
    /// Loads the configuration from a case directory.
    pub fn load(case_dir: &Path) -> Result<Self, EvalError> {
        let path = case_dir.join(EVAL_CONFIG_FILE);
        let content = fs::read_to_string(&path).map_err(|source| EvalError::CaseConfigRead {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| EvalError::CaseConfigParse { path, source })
    }
}
