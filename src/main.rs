//! `skill-evals` binary.
//!
//! Evaluates one case directory, or every case found under a directory,
//! against a coding agent and prints the build and test verdicts.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = skill_evals::cli::parse_cli();

    // RUST_LOG wins over --log-level.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    skill_evals::cli::run_with_cli(cli).await
}
