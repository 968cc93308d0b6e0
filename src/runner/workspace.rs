//! Ephemeral evaluation workspaces.
//!
//! A case directory holds template files the agent may see and oracle files
//! (the graders) it must not. The workspace is first materialized with the
//! oracles withheld; after generation the oracles are copied back in.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Oracle files matched by exact name.
pub const ORACLE_FILE_NAMES: &[&str] = &["eval.ts", "eval.tsx", "eval.json"];

/// Oracle files matched by suffix.
pub const ORACLE_FILE_SUFFIXES: &[&str] = &[".test.ts", ".test.tsx"];

/// Entries never copied in either direction.
pub const IGNORED_NAMES: &[&str] = &[
    ".git",
    "node_modules",
    ".DS_Store",
    "dist",
    "build",
    "pnpm-lock.yaml",
    "package-lock.json",
];

/// Test-runner configuration written into the workspace before grading.
pub const TEST_CONFIG_FILE: &str = "vitest.eval.config.ts";

/// Test entry points the generated configuration discovers.
pub const TEST_INCLUDE: &[&str] = &["eval.ts", "eval.tsx"];

/// Returns true if `name` is a test oracle.
pub fn is_oracle_file(name: &str) -> bool {
    ORACLE_FILE_NAMES.contains(&name) || ORACLE_FILE_SUFFIXES.iter().any(|s| name.ends_with(s))
}

/// Returns true if `name` is never copied.
pub fn is_ignored(name: &str) -> bool {
    IGNORED_NAMES.contains(&name)
}

/// Which entries a copy admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterPolicy {
    /// Everything except oracles; used for the agent-visible workspace.
    ExcludeOracles,
    /// Only oracles; used to restore the graders after generation.
    OraclesOnly,
}

impl FilterPolicy {
    /// Decides whether an entry is admitted, from its name alone.
    ///
    /// Directories are always descended by [`FilterPolicy::OraclesOnly`]
    /// since oracles may be nested anywhere.
    pub fn admits(self, name: &str, is_dir: bool) -> bool {
        if is_ignored(name) {
            return false;
        }
        match self {
            FilterPolicy::ExcludeOracles => !is_oracle_file(name),
            FilterPolicy::OraclesOnly => is_dir || is_oracle_file(name),
        }
    }
}

/// Recursively copies `src` into `dest` through `policy`.
///
/// Existing destination directories are reused and existing files are
/// overwritten. With [`FilterPolicy::OraclesOnly`], directories are only
/// created when an oracle file lands in them. Returns the number of files
/// copied.
pub fn materialize(src: &Path, dest: &Path, policy: FilterPolicy) -> io::Result<usize> {
    fs::create_dir_all(dest)?;

    let walker = WalkDir::new(src)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            policy.admits(&name, entry.file_type().is_dir())
        });

    let mut copied = 0;
    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(io::Error::other)?;
        let target = dest.join(rel);

        if entry.file_type().is_dir() {
            if policy == FilterPolicy::ExcludeOracles {
                fs::create_dir_all(&target)?;
            }
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(entry.path(), &target)?;
        copied += 1;
    }

    debug!(
        src = %src.display(),
        dest = %dest.display(),
        ?policy,
        copied,
        "Materialized directory"
    );
    Ok(copied)
}

/// Copies a case into `dest`, withholding oracle files.
pub fn stage_case(case_dir: &Path, dest: &Path) -> io::Result<usize> {
    materialize(case_dir, dest, FilterPolicy::ExcludeOracles)
}

/// Copies the case's oracle files back into `dest`, leaving everything else alone.
pub fn restore_oracles(case_dir: &Path, dest: &Path) -> io::Result<usize> {
    materialize(case_dir, dest, FilterPolicy::OraclesOnly)
}

/// Renders the test-runner configuration restricting discovery to oracles.
pub fn test_config_contents() -> String {
    let include = TEST_INCLUDE
        .iter()
        .map(|p| format!("\"{}\"", p))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"
import {{ defineConfig }} from "vitest/config";

export default defineConfig({{
  test: {{
    include: [{include}],
  }},
}});
"#
    )
}

/// A temporary directory exclusively owned by one run.
///
/// Dropping the workspace deletes it, so every exit path of a run cleans
/// up. [`Workspace::retain`] disarms the deletion for post-mortems, and
/// [`Workspace::retain_on_drop`] does the same for every exit path.
#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    path: PathBuf,
    retain_on_drop: bool,
}

impl Workspace {
    /// Creates a fresh, empty workspace under `root`.
    ///
    /// The name combines the creation timestamp with a random suffix so
    /// concurrent runs never share a directory.
    pub fn create(root: &Path) -> io::Result<Self> {
        fs::create_dir_all(root)?;
        let prefix = format!("skill-eval-{}-", chrono::Utc::now().timestamp_millis());
        let dir = tempfile::Builder::new().prefix(&prefix).tempdir_in(root)?;
        let path = dir.path().to_path_buf();
        debug!(workspace = %path.display(), "Created workspace");
        Ok(Self {
            dir: Some(dir),
            path,
            retain_on_drop: false,
        })
    }

    /// Keeps the directory on disk when the workspace is dropped.
    pub fn retain_on_drop(mut self, retain: bool) -> Self {
        self.retain_on_drop = retain;
        self
    }

    /// Returns the workspace path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the test-runner configuration into the workspace.
    pub fn write_test_config(&self) -> io::Result<PathBuf> {
        let config_path = self.path.join(TEST_CONFIG_FILE);
        fs::write(&config_path, test_config_contents())?;
        Ok(config_path)
    }

    /// Keeps the directory on disk and returns its path.
    pub fn retain(mut self) -> PathBuf {
        if let Some(dir) = self.dir.take() {
            let path = dir.keep();
            info!(workspace = %path.display(), "Workspace retained");
            return path;
        }
        self.path.clone()
    }

    /// Deletes the workspace now, reporting any failure.
    pub fn cleanup(mut self) -> io::Result<()> {
        match self.dir.take() {
            Some(dir) => dir.close(),
            None => Ok(()),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        if self.retain_on_drop {
            let path = dir.keep();
            info!(workspace = %path.display(), "Workspace retained");
        } else {
            debug!(workspace = %self.path.display(), "Removing workspace");
            if let Err(e) = dir.close() {
                warn!(workspace = %self.path.display(), error = %e, "Failed to remove workspace");
            }
        }
    }
}
