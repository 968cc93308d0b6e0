//! Final verdict of an evaluation run.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Terminal artifact of one run. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    /// Build and tests both succeeded.
    pub success: bool,
    /// Build command exited 0.
    pub build_success: bool,
    /// Oracle tests exited 0.
    pub test_success: bool,
    /// Wall-clock milliseconds since the workspace was created.
    pub duration: u64,
    /// Agent's result text, or its raw stdout.
    pub output: String,
    /// Retained workspace (verbose runs only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,
    /// Model the agent reported using.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
}

impl RunResult {
    /// Composes a result; `success` is derived, never supplied.
    pub fn new(
        build_success: bool,
        test_success: bool,
        duration: Duration,
        output: impl Into<String>,
    ) -> Self {
        Self {
            success: build_success && test_success,
            build_success,
            test_success,
            duration: duration.as_millis() as u64,
            output: output.into(),
            work_dir: None,
            model_id: None,
        }
    }

    /// Records the retained workspace.
    pub fn with_work_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.work_dir = dir;
        self
    }

    /// Records the model the agent reported.
    pub fn with_model_id(mut self, model_id: Option<String>) -> Self {
        self.model_id = model_id;
        self
    }
}

impl std::fmt::Display for RunResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verdict = if self.success { "PASS" } else { "FAIL" };
        write!(
            f,
            "{} (build: {}, tests: {}, {:.1}s)",
            verdict,
            if self.build_success { "ok" } else { "failed" },
            if self.test_success { "ok" } else { "failed" },
            self.duration as f64 / 1000.0
        )
    }
}
