//! Evaluation run orchestrator.
//!
//! One run takes a case directory through a fixed, strictly sequential
//! pipeline:
//!
//! ```text
//! stage (oracles withheld) → skill install → load prompt → agent
//!   → restore oracles → install deps → build → test config → tests → verdict
//! ```
//!
//! Tool failures are folded into the verdict. Only an unusable case
//! configuration or a workspace that cannot be materialized aborts the run.
//! The workspace is owned by the run and removed on every exit path unless
//! the run is verbose.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::agents::{AgentRequest, ClaudeCodeAgent, CodeAgent};
use super::config::{EvalConfig, HarnessConfig, RunOptions};
use super::process::{exec_command, truncate, ExecRequest, ExecResult};
use super::result::RunResult;
use super::workspace::{restore_oracles, stage_case, Workspace};
use crate::error::EvalError;

/// Receives a short label at each major pipeline step.
pub type ProgressCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Runs evaluation cases.
#[derive(Clone)]
pub struct EvalRunner {
    options: RunOptions,
    config: HarnessConfig,
    agent: Option<Arc<dyn CodeAgent>>,
    progress: Option<ProgressCallback>,
}

/// State owned by a single run.
struct RunContext {
    workspace: Workspace,
    start: Instant,
}

impl EvalRunner {
    /// Creates a runner with the default tool commands and agent.
    pub fn new(options: RunOptions) -> Self {
        Self {
            options,
            config: HarnessConfig::default(),
            agent: None,
            progress: None,
        }
    }

    /// Replaces the tool command configuration.
    pub fn with_config(mut self, config: HarnessConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses a specific agent instead of the configured CLI.
    pub fn with_agent(mut self, agent: Arc<dyn CodeAgent>) -> Self {
        self.agent = Some(agent);
        self
    }

    /// Registers a progress callback.
    pub fn with_progress(mut self, progress: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    /// Returns the run options.
    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Evaluates one case and returns its verdict.
    #[instrument(skip_all, fields(run_id = %Uuid::new_v4(), case = %case_dir.display()))]
    pub async fn run(&self, case_dir: &Path) -> Result<RunResult, EvalError> {
        let start = Instant::now();
        info!(model = %self.options.model, skill = ?self.options.skill, "Starting evaluation");

        let root = self.config.work_root();
        let workspace = Workspace::create(&root)
            .map_err(|source| EvalError::Workspace {
                path: root.clone(),
                source,
            })?
            .retain_on_drop(self.options.verbose);
        let ctx = RunContext { workspace, start };

        self.step("copying files");
        stage_case(case_dir, ctx.workspace.path()).map_err(|source| EvalError::Workspace {
            path: ctx.workspace.path().to_path_buf(),
            source,
        })?;

        if let Some(skill) = &self.options.skill {
            self.install_skill(&ctx, skill).await?;
        }

        let eval_config = EvalConfig::load(case_dir)?;

        self.step(&format!("generating code with {}", self.options.model));
        self.diagnostic(&format!("Running agent with model: {}", self.options.model));
        let agent = self.agent();
        let agent_result = agent
            .generate(&AgentRequest {
                prompt: eval_config.query,
                working_dir: ctx.workspace.path().to_path_buf(),
                model: self.options.model.clone(),
                timeout: self.options.timeout,
                baseline: self.options.baseline,
                verbose: self.options.verbose,
            })
            .await;
        self.diagnostic(&format!(
            "Agent {} exited with code {}, output length: {}",
            agent.name(),
            agent_result.exec.exit_code,
            agent_result.exec.stdout.len()
        ));

        restore_oracles(case_dir, ctx.workspace.path()).map_err(|source| {
            EvalError::Workspace {
                path: ctx.workspace.path().to_path_buf(),
                source,
            }
        })?;

        self.step("installing dependencies");
        self.diagnostic("Installing dependencies...");
        let install = self.exec_step(&ctx, &self.config.install_command).await;
        if !install.is_success() {
            self.diagnostic(&format!(
                "Install warning: {}",
                truncate(&install.stderr, 2000)
            ));
        }

        self.step("building project");
        self.diagnostic("Running build...");
        let build = self.exec_step(&ctx, &self.config.build_command).await;
        let build_success = build.is_success();
        if !build_success {
            self.diagnostic(&format!("Build failed: {}", truncate(&build.stderr, 2000)));
        }

        self.step("running tests");
        ctx.workspace
            .write_test_config()
            .map_err(|source| EvalError::Workspace {
                path: ctx.workspace.path().to_path_buf(),
                source,
            })?;
        self.diagnostic("Running tests...");
        let tests = self.exec_step(&ctx, &self.config.test_command).await;
        let test_success = tests.is_success();
        if !test_success {
            self.diagnostic(&format!("Test output: {}", truncate(&tests.stdout, 4000)));
            self.diagnostic(&format!("Test errors: {}", truncate(&tests.stderr, 2000)));
        }

        let RunContext { workspace, start } = ctx;
        let work_dir = if self.options.verbose {
            Some(workspace.retain())
        } else {
            if let Err(e) = workspace.cleanup() {
                debug!(error = %e, "Workspace cleanup failed");
            }
            None
        };

        let result = RunResult::new(
            build_success,
            test_success,
            start.elapsed(),
            agent_result.output_text(),
        )
        .with_work_dir(work_dir)
        .with_model_id(agent_result.model_id);

        info!(
            success = result.success,
            build_success = result.build_success,
            test_success = result.test_success,
            duration_ms = result.duration,
            "Evaluation finished"
        );
        Ok(result)
    }

    /// Installs the skill into the workspace. Best effort: a failing
    /// installer is reported and the run continues.
    async fn install_skill(&self, ctx: &RunContext, skill: &str) -> Result<(), EvalError> {
        self.step(&format!("installing skill: {}", skill));
        let skill_root = ctx.workspace.path().join(&self.config.skill_root);
        fs::create_dir_all(&skill_root).map_err(|source| EvalError::Workspace {
            path: skill_root.clone(),
            source,
        })?;

        self.diagnostic(&format!("Installing skill: {}", skill));
        let result = self
            .exec_step(ctx, &self.config.skill_install_command(skill))
            .await;
        if !result.is_success() {
            self.diagnostic(&format!(
                "Skill install warning: {}",
                truncate(&result.stderr, 2000)
            ));
        }
        Ok(())
    }

    async fn exec_step(&self, ctx: &RunContext, command: &str) -> ExecResult {
        let request = ExecRequest::new(command, ctx.workspace.path())
            .with_timeout(self.config.command_timeout);
        let result = exec_command(&request).await;
        if self.options.verbose && !result.stderr.is_empty() {
            debug!("stderr: {}", truncate(&result.stderr, 500));
        }
        result
    }

    fn agent(&self) -> Arc<dyn CodeAgent> {
        match &self.agent {
            Some(agent) => Arc::clone(agent),
            None => Arc::new(ClaudeCodeAgent::with_binary(&self.config.agent_binary)),
        }
    }

    fn step(&self, label: &str) {
        debug!(step = label, "Pipeline step");
        if let Some(progress) = &self.progress {
            progress(label);
        }
    }

    /// Verbose-only diagnostics; kept at debug level otherwise.
    fn diagnostic(&self, message: &str) {
        if self.options.verbose {
            info!("{}", message);
        } else {
            debug!("{}", message);
        }
    }
}
