//! CLI command definitions for skill-evals.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use crate::runner::config::DEFAULT_MODEL;
use crate::runner::suite::{is_case_dir, run_suite};
use crate::runner::{EvalRunner, HarnessConfig, RunOptions};

/// Evaluation harness for coding agents and their skills.
#[derive(Parser)]
#[command(name = "skill-evals")]
#[command(about = "Run a coding agent against best-practice eval cases and grade the result")]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Evaluate a case directory, or every case found under a directory.
    Run(RunArgs),
}

/// Arguments for `skill-evals run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Case directory (holding eval.json) or a directory of cases.
    pub path: PathBuf,

    /// Model passed to the agent.
    #[arg(short = 'm', long, env = "SKILL_EVAL_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Skill to install into each workspace before generation.
    #[arg(short = 's', long, env = "SKILL_EVAL_SKILL")]
    pub skill: Option<String>,

    /// Agent timeout in seconds.
    #[arg(short = 't', long, default_value = "600")]
    pub timeout_secs: u64,

    /// Disable skill slash commands for a baseline comparison run.
    #[arg(long)]
    pub baseline: bool,

    /// Keep workspaces and print diagnostics.
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Number of cases evaluated concurrently.
    #[arg(short = 'p', long, default_value = "1")]
    pub parallel: usize,

    /// Agent executable.
    #[arg(long, default_value = "claude")]
    pub agent_binary: String,

    /// Write the JSON results to this file.
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Print JSON instead of a human summary.
    #[arg(short = 'j', long)]
    pub json: bool,
}

impl RunArgs {
    fn run_options(&self) -> RunOptions {
        let mut options = RunOptions::new(self.model.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .baseline(self.baseline)
            .verbose(self.verbose);
        if let Some(skill) = &self.skill {
            options = options.with_skill(skill.clone());
        }
        options
    }
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => run_command(args).await,
    }
}

async fn run_command(args: RunArgs) -> anyhow::Result<()> {
    if !args.path.is_dir() {
        anyhow::bail!("Not a directory: {}", args.path.display());
    }

    let config = HarnessConfig::default().with_agent_binary(args.agent_binary.clone());
    let quiet = args.json;
    let runner = EvalRunner::new(args.run_options())
        .with_config(config)
        .with_progress(move |step| {
            if !quiet {
                println!("  {}", step);
            }
        });

    if is_case_dir(&args.path) {
        run_single(&args, &runner, &args.path).await
    } else {
        let summary = run_suite(&args.path, Arc::new(runner), args.parallel).await?;
        if let Some(output) = &args.output {
            summary.write_json(output)?;
            info!("Wrote results to {}", output.display());
        }
        if args.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            for outcome in &summary.results {
                match (&outcome.result, &outcome.error) {
                    (Some(result), _) => println!("{:<50} {}", outcome.name, result),
                    (None, Some(error)) => println!("{:<50} ERROR {}", outcome.name, error),
                    (None, None) => println!("{:<50} ERROR", outcome.name),
                }
            }
            println!(
                "\n{}/{} passed ({:.0}%)",
                summary.passed,
                summary.total,
                summary.pass_rate() * 100.0
            );
        }
        Ok(())
    }
}

async fn run_single(args: &RunArgs, runner: &EvalRunner, case: &Path) -> anyhow::Result<()> {
    let result = runner.run(case).await?;
    let json = serde_json::to_string_pretty(&result)?;

    if let Some(output) = &args.output {
        std::fs::write(output, &json)?;
        info!("Wrote result to {}", output.display());
    }
    if args.json {
        println!("{}", json);
    } else {
        println!("{}", result);
        if let Some(dir) = &result.work_dir {
            println!("  workspace: {}", dir.display());
        }
    }
    Ok(())
}
