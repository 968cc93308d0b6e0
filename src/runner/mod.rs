//! Evaluation runner.
//!
//! Runs a code-generation agent against an evaluation case and grades what
//! it wrote.
//!
//! # Architecture
//!
//! ```text
//! case dir ──stage──▶ workspace ──▶ agent ──▶ restore oracles ──▶ install/build/test ──▶ RunResult
//!   (eval.json, eval.ts withheld)                 (eval.ts back)
//! ```
//!
//! The runner:
//! 1. Copies the case into a fresh workspace without its oracle files
//! 2. Optionally installs a skill for the agent to use
//! 3. Lets the agent write code from the case prompt
//! 4. Restores the oracles, installs dependencies, builds and runs the tests
//! 5. Removes the workspace (kept in verbose mode)
//!
//! # Example
//!
//! ```ignore
//! use skill_evals::runner::{EvalRunner, RunOptions};
//!
//! let options = RunOptions::new("sonnet")
//!     .with_skill("vue-best-practices")
//!     .with_timeout(Duration::from_secs(600));
//!
//! let runner = EvalRunner::new(options).with_progress(|step| println!("  {step}"));
//! let result = runner.run(Path::new("evals/reactivity-shallowref")).await?;
//!
//! println!("{}", result);
//! ```

pub mod agents;
pub mod config;
pub mod executor;
pub mod process;
pub mod result;
pub mod suite;
pub mod workspace;

pub use agents::{AgentRequest, AgentResponse, AgentResult, ClaudeCodeAgent, CodeAgent};
pub use config::{EvalConfig, HarnessConfig, RunOptions};
pub use executor::{EvalRunner, ProgressCallback};
pub use process::{exec_command, ExecRequest, ExecResult};
pub use result::RunResult;
pub use suite::{discover_cases, run_suite, CaseOutcome, SuiteSummary};
pub use workspace::{
    is_ignored, is_oracle_file, materialize, restore_oracles, stage_case, FilterPolicy, Workspace,
};
