//! Command-line interface for skill-evals.
//!
//! A thin wrapper over the runner: evaluate one case or every case under a
//! directory and print the verdicts.

mod commands;

pub use commands::{parse_cli, run, run_with_cli};
