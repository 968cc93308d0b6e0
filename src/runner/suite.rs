//! Running many cases.
//!
//! Each case is an independent pipeline with its own workspace, so cases
//! can run side by side without coordination.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use walkdir::WalkDir;

use super::config::EVAL_CONFIG_FILE;
use super::executor::EvalRunner;
use super::result::RunResult;
use super::workspace::is_ignored;
use crate::error::EvalError;

/// Outcome of one case within a suite.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseOutcome {
    /// Case directory name.
    pub name: String,
    /// Case directory.
    pub path: PathBuf,
    /// Verdict, when the case could be evaluated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<RunResult>,
    /// Why the case could not be evaluated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CaseOutcome {
    /// Checks if the case passed.
    pub fn passed(&self) -> bool {
        self.result.as_ref().is_some_and(|r| r.success)
    }
}

/// Aggregate over a suite run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteSummary {
    pub total: usize,
    pub passed: usize,
    pub build_failures: usize,
    pub test_failures: usize,
    pub errors: usize,
    pub avg_duration_ms: u64,
    pub results: Vec<CaseOutcome>,
}

impl SuiteSummary {
    /// Aggregates case outcomes.
    pub fn from_outcomes(results: Vec<CaseOutcome>) -> Self {
        let mut passed = 0;
        let mut build_failures = 0;
        let mut test_failures = 0;
        let mut errors = 0;
        let mut total_ms = 0u64;
        let mut timed = 0u64;

        for outcome in &results {
            match &outcome.result {
                Some(result) => {
                    total_ms += result.duration;
                    timed += 1;
                    if result.success {
                        passed += 1;
                    } else if !result.build_success {
                        build_failures += 1;
                    } else {
                        test_failures += 1;
                    }
                }
                None => errors += 1,
            }
        }

        Self {
            total: results.len(),
            passed,
            build_failures,
            test_failures,
            errors,
            avg_duration_ms: if timed > 0 { total_ms / timed } else { 0 },
            results,
        }
    }

    /// Fraction of cases that passed.
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 / self.total as f64
        }
    }

    /// Writes the summary as pretty JSON.
    pub fn write_json(&self, path: &Path) -> Result<(), EvalError> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Returns true if `dir` is a case directory.
pub fn is_case_dir(dir: &Path) -> bool {
    dir.join(EVAL_CONFIG_FILE).is_file()
}

/// Finds every case directory under `root`, sorted.
///
/// `root` itself counts when it holds an `eval.json`. Ignored directories
/// such as `node_modules` are not descended.
pub fn discover_cases(root: &Path) -> Result<Vec<PathBuf>, EvalError> {
    let mut cases = Vec::new();
    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        entry.depth() == 0 || !is_ignored(&entry.file_name().to_string_lossy())
    });

    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_dir() && is_case_dir(entry.path()) {
            cases.push(entry.into_path());
        }
    }

    cases.sort();
    Ok(cases)
}

fn case_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Evaluates every case under `root`, `parallel` at a time.
pub async fn run_suite(
    root: &Path,
    runner: Arc<EvalRunner>,
    parallel: usize,
) -> Result<SuiteSummary, EvalError> {
    let cases = discover_cases(root)?;
    if cases.is_empty() {
        return Err(EvalError::NoCases(root.to_path_buf()));
    }

    let parallel = parallel.max(1);
    info!(
        model = %runner.options().model,
        skill = ?runner.options().skill,
        "Discovered {} cases in {}, running with parallelism={}",
        cases.len(),
        root.display(),
        parallel
    );

    let mut results = Vec::with_capacity(cases.len());
    for chunk in cases.chunks(parallel) {
        let mut handles = Vec::new();
        for case in chunk {
            let case = case.clone();
            let runner = Arc::clone(&runner);
            handles.push(tokio::spawn(async move {
                let outcome = runner.run(&case).await;
                (case, outcome)
            }));
        }

        for handle in handles {
            let (path, outcome) = match handle.await {
                Ok(done) => done,
                Err(e) => {
                    warn!("Case task panicked: {e}");
                    continue;
                }
            };
            let name = case_name(&path);
            let outcome = match outcome {
                Ok(result) => {
                    info!(case = %name, "{}", result);
                    CaseOutcome {
                        name,
                        path,
                        result: Some(result),
                        error: None,
                    }
                }
                Err(e) => {
                    if e.is_case_config() {
                        warn!(case = %name, error = %e, "Case configuration rejected");
                    } else {
                        error!(case = %name, error = %e, "Case could not be evaluated");
                    }
                    CaseOutcome {
                        name,
                        path,
                        result: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            results.push(outcome);
        }
    }

    let summary = SuiteSummary::from_outcomes(results);
    info!(
        "Suite finished: {}/{} passed ({} build failures, {} test failures, {} errors)",
        summary.passed,
        summary.total,
        summary.build_failures,
        summary.test_failures,
        summary.errors
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    use crate::runner::config::HarnessConfig;

    fn make_case(root: &Path, rel: &str) {
        let dir = root.join(rel);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(EVAL_CONFIG_FILE), r#"{"query":"q"}"#).unwrap();
    }

    fn outcome(name: &str, result: Option<RunResult>) -> CaseOutcome {
        CaseOutcome {
            name: name.to_string(),
            path: PathBuf::from(name),
            error: result.is_none().then(|| "bad config".to_string()),
            result,
        }
    }

    #[test]
    fn test_discover_cases() {
        let root = TempDir::new().unwrap();
        make_case(root.path(), "evals/b-case");
        make_case(root.path(), "evals/a-case");
        make_case(root.path(), "evals/a-case/node_modules/pkg");
        fs::create_dir_all(root.path().join("evals/not-a-case")).unwrap();

        let cases = discover_cases(root.path()).unwrap();
        assert_eq!(
            cases,
            vec![
                root.path().join("evals/a-case"),
                root.path().join("evals/b-case"),
            ]
        );
    }

    #[test]
    fn test_discover_single_case_root() {
        let root = TempDir::new().unwrap();
        make_case(root.path(), "");
        assert_eq!(discover_cases(root.path()).unwrap(), vec![root.path().to_path_buf()]);
    }

    #[test]
    fn test_summary_counts() {
        let ms = Duration::from_millis(100);
        let summary = SuiteSummary::from_outcomes(vec![
            outcome("pass", Some(RunResult::new(true, true, ms, ""))),
            outcome("build", Some(RunResult::new(false, false, ms * 3, ""))),
            outcome("test", Some(RunResult::new(true, false, ms * 2, ""))),
            outcome("error", None),
        ]);

        assert_eq!(summary.total, 4);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.build_failures, 1);
        assert_eq!(summary.test_failures, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.avg_duration_ms, 200);
        assert!((summary.pass_rate() - 0.25).abs() < f64::EPSILON);
        assert!(summary.results[0].passed());
        assert!(!summary.results[3].passed());
    }

    #[test]
    fn test_write_json() {
        let dir = TempDir::new().unwrap();
        let summary = SuiteSummary::from_outcomes(vec![outcome(
            "pass",
            Some(RunResult::new(true, true, Duration::from_millis(7), "ok")),
        )]);
        let path = dir.path().join("summary.json");
        summary.write_json(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["passed"], 1);
        assert_eq!(json["avgDurationMs"], 7);
        assert_eq!(json["results"][0]["result"]["buildSuccess"], true);
    }

    #[tokio::test]
    async fn test_run_suite_records_config_errors() {
        let root = TempDir::new().unwrap();
        let work_root = TempDir::new().unwrap();
        let dir = root.path().join("truncated");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(EVAL_CONFIG_FILE), r#"{"query": "add"#).unwrap();

        let runner = Arc::new(
            EvalRunner::new(Default::default())
                .with_config(HarnessConfig::default().with_work_root(work_root.path())),
        );
        let summary = run_suite(root.path(), runner, 2).await.unwrap();

        assert_eq!(summary.total, 1);
        assert_eq!(summary.errors, 1);
        let error = summary.results[0].error.as_deref().unwrap();
        assert!(error.starts_with("Invalid case configuration"));
        assert_eq!(fs::read_dir(work_root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_run_suite_without_cases() {
        let root = TempDir::new().unwrap();
        let runner = Arc::new(EvalRunner::new(Default::default()));
        let err = run_suite(root.path(), runner, 2).await.unwrap_err();
        assert!(matches!(err, EvalError::NoCases(_)));
    }
}
