//! Local build execution.
//!
//! The scheduler only cares about a boolean outcome per `(feedstock,
//! version)`; everything else — checking out the right recipe commit,
//! rerendering, patching, running the container build, uploading — belongs
//! to the builder command this module spawns. Combined output goes to
//! `<feedstock>.log` in the log directory so parallel builds never
//! interleave on the console.

pub mod pins;

use std::path::PathBuf;
use std::process::Stdio;

use crate::schedule::{BuildExecutor, BuildOutcome};

/// Feedstocks with known unresolved build breakage; failed without spawning
/// the builder so the rest of the run keeps moving.
const KNOWN_BROKEN: &[&str] = &["vtk", "fontconfig", "mamba", "boost"];

/// [`BuildExecutor`] spawning a builder command per pinned version.
pub struct CommandBuilder {
    /// Builder executable to spawn.
    program: String,
    /// Extra arguments placed before the feedstock and version.
    extra_args: Vec<String>,
    /// Working directory for the builder process.
    work_dir: PathBuf,
    /// Directory the per-feedstock log files are written to.
    log_dir: PathBuf,
}

impl CommandBuilder {
    /// What: Create an executor for a builder command.
    ///
    /// Inputs:
    /// - `program`: Builder executable; invoked as
    ///   `program [extra_args..] <feedstock> <version>`.
    /// - `extra_args`: Arguments inserted before the feedstock.
    /// - `work_dir`: Working directory for the builder and the feedstock
    ///   checkouts.
    /// - `log_dir`: Where `<feedstock>.log` files are written.
    #[must_use]
    pub const fn new(
        program: String,
        extra_args: Vec<String>,
        work_dir: PathBuf,
        log_dir: PathBuf,
    ) -> Self {
        Self {
            program,
            extra_args,
            work_dir,
            log_dir,
        }
    }

    /// Spawn the builder for one version and wait for its exit status.
    fn spawn_build(&self, feedstock: &str, version: &str) -> std::io::Result<BuildOutcome> {
        let log_path = self.log_dir.join(format!("{feedstock}.log"));
        let log = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;
        let log_err = log.try_clone()?;
        let status = std::process::Command::new(&self.program)
            .args(&self.extra_args)
            .arg(feedstock)
            .arg(version)
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .status()?;
        tracing::info!(feedstock, version, code = status.code(), "builder exited");
        if status.success() {
            Ok(BuildOutcome::Succeeded)
        } else {
            Ok(BuildOutcome::Failed)
        }
    }
}

impl BuildExecutor for CommandBuilder {
    fn build(&self, feedstock: &str, version: &str) -> BuildOutcome {
        if KNOWN_BROKEN.contains(&feedstock) {
            tracing::warn!(feedstock, "known issue, skipping build");
            return BuildOutcome::Failed;
        }
        match self.spawn_build(feedstock, version) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(feedstock, version, error = %e, "failed to spawn builder");
                BuildOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// What: Known-broken feedstocks fail without touching the builder.
    ///
    /// - Input: A feedstock on the skip list and a builder that cannot exist
    /// - Output: `Failed`, and no log file is created
    #[test]
    fn build_known_broken_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let builder = CommandBuilder::new(
            "stockyard-no-such-builder".to_string(),
            Vec::new(),
            dir.path().to_path_buf(),
            dir.path().to_path_buf(),
        );
        assert_eq!(builder.build("vtk", "latest"), BuildOutcome::Failed);
        assert!(!dir.path().join("vtk.log").exists());
    }

    /// What: Builder exit status maps onto the outcome.
    ///
    /// - Input: `true` and `false` as builder commands
    /// - Output: `Succeeded` and `Failed` respectively, with a log file
    #[test]
    #[cfg(unix)]
    fn build_exit_status_maps_to_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let ok = CommandBuilder::new(
            "true".to_string(),
            Vec::new(),
            dir.path().to_path_buf(),
            dir.path().to_path_buf(),
        );
        assert_eq!(ok.build("numpy", "latest"), BuildOutcome::Succeeded);
        assert!(dir.path().join("numpy.log").exists());

        let bad = CommandBuilder::new(
            "false".to_string(),
            Vec::new(),
            dir.path().to_path_buf(),
            dir.path().to_path_buf(),
        );
        assert_eq!(bad.build("numpy", "latest"), BuildOutcome::Failed);
    }

    /// What: A missing builder executable is a failure, not a panic.
    ///
    /// - Input: Nonexistent builder program
    /// - Output: `Failed`
    #[test]
    fn build_missing_builder_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let builder = CommandBuilder::new(
            "stockyard-no-such-builder".to_string(),
            Vec::new(),
            dir.path().to_path_buf(),
            dir.path().to_path_buf(),
        );
        assert_eq!(builder.build("numpy", "latest"), BuildOutcome::Failed);
    }
}
