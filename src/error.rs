//! Error types for skill-evals.
//!
//! Only failures that make a case impossible to evaluate are errors here:
//! an unreadable or malformed case configuration, or a workspace that could
//! not be materialized. Process failures, timeouts and agent output that
//! cannot be decoded are represented as data in the run results instead.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort an evaluation run.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("Failed to read case configuration '{}': {source}", .path.display())]
    CaseConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid case configuration '{}': {source}", .path.display())]
    CaseConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to prepare workspace '{}': {source}", .path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No evaluation cases found in {}", .0.display())]
    NoCases(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EvalError {
    /// Returns true if the error came from the case's own configuration.
    pub fn is_case_config(&self) -> bool {
        matches!(
            self,
            EvalError::CaseConfigRead { .. } | EvalError::CaseConfigParse { .. }
        )
    }
}
