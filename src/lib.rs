//! skill-evals: evaluation harness for coding agents and their skills.
//!
//! Measures whether an agent, optionally augmented with a skill, writes code
//! that follows framework best practices. Each case is staged into an
//! isolated workspace with its graders withheld, handed to the agent, then
//! built and tested against the restored graders.

pub mod cli;
pub mod error;
pub mod runner;

pub use error::EvalError;
pub use runner::{EvalRunner, HarnessConfig, RunOptions, RunResult};
