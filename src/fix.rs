//! Engine entry point: compile, walk, process, report.

use crate::config::source::absolute;
use crate::config::{RunConfig, TransformationSet};
use crate::driver::{Driver, RunSummary};
use crate::error::Result;
use crate::matcher::walk;
use crate::transform::{Plan, PreconditionRegistry, ProcedureRegistry};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};

/// A fix run over one directory tree.
pub struct Fix {
    config: RunConfig,
    procedures: ProcedureRegistry,
    preconditions: PreconditionRegistry,
}

impl Fix {
    /// Creates a fix run rooted at the given directory.
    pub fn in_dir(root: impl Into<PathBuf>) -> Self {
        Self::with_config(RunConfig::new(root))
    }

    /// Creates a fix run from explicit run parameters.
    pub fn with_config(config: RunConfig) -> Self {
        Self {
            config,
            procedures: ProcedureRegistry::default(),
            preconditions: PreconditionRegistry::default(),
        }
    }

    /// Keeps the description file out of the walk.
    pub fn description(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.description = Some(path.into());
        self
    }

    /// Sets the worker pool size.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.config.jobs = Some(jobs);
        self
    }

    /// Enables dry-run mode (compute changes without writing them).
    pub fn dry_run(mut self) -> Self {
        self.config.dry_run = true;
        self
    }

    /// Disables broken transformations instead of failing the whole run.
    pub fn keep_going(mut self) -> Self {
        self.config.keep_going = true;
        self
    }

    /// Uses custom procedure and precondition registries.
    pub fn registries(
        mut self,
        procedures: ProcedureRegistry,
        preconditions: PreconditionRegistry,
    ) -> Self {
        self.procedures = procedures;
        self.preconditions = preconditions;
        self
    }

    /// Returns the run parameters.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Applies `set` to the tree, writing progress lines to `out`.
    ///
    /// Configuration problems abort before any file is read unless
    /// `keep_going` is set, in which case the broken transformations are
    /// skipped. A missing root is fatal; per-file and per-directory errors
    /// are collected in the summary. The reported duration covers the whole
    /// call.
    pub fn apply(&self, set: &TransformationSet, out: &mut dyn Write) -> Result<RunSummary> {
        let started = Instant::now();
        let plan = Plan::compile_with(set, &self.procedures, &self.preconditions);
        let plan = if self.config.keep_going {
            if !plan.issues().is_empty() {
                warn!(
                    disabled = plan.issues().len(),
                    "continuing without broken transformations"
                );
            }
            plan
        } else {
            plan.strict()?
        };

        // Both sides resolved the same way, so a relative root still skips
        // the description file.
        let root = absolute(&self.config.root);
        let description = self.config.description.as_deref().map(absolute);
        let walked = walk(&root, &set.exclude, description.as_deref())?;
        debug!(root = %root.display(), files = walked.files.len(), "walk complete");

        let driver = Driver::new(self.config.worker_count())
            .dry_run(self.config.dry_run)
            .label(label(&root))
            .started(started);
        let mut summary = driver.run(&walked.files, &plan, out)?;

        let mut failures = walked.errors;
        failures.append(&mut summary.failures);
        summary.failures = failures;
        Ok(summary)
    }
}

fn label(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Transformation;
    use crate::error::SeedError;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_apply_end_to_end() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "foo").unwrap();
        fs::write(dir.path().join("b.txt"), "bar").unwrap();
        let set = TransformationSet::new(vec![
            Transformation::new("*.txt").procedure("Replace", ["foo", "baz"]),
        ]);

        let summary = Fix::in_dir(dir.path())
            .jobs(2)
            .apply(&set, &mut std::io::sink())
            .unwrap();

        assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "baz");
        assert_eq!(fs::read_to_string(dir.path().join("b.txt")).unwrap(), "bar");
        assert_eq!(summary.changed_count(), 1);
        assert_eq!(summary.total, 2);
    }

    #[test]
    fn test_config_errors_abort_before_any_write() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "foo").unwrap();
        let set = TransformationSet::new(vec![
            Transformation::new("*.txt").procedure("Replace", ["foo", "baz"]),
            Transformation::new("*.txt").procedure("Frobnicate", ["x"]),
        ]);

        let err = Fix::in_dir(dir.path())
            .apply(&set, &mut std::io::sink())
            .unwrap_err();

        assert!(matches!(err, SeedError::Config(ref issues) if issues.len() == 1));
        assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "foo");
    }

    #[test]
    fn test_keep_going_skips_broken_transformations() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "foo").unwrap();
        let set = TransformationSet::new(vec![
            Transformation::new("*.txt")
                .pre("Unheard")
                .procedure("Replace", ["foo", "evil"]),
            Transformation::new("*.txt").procedure("Replace", ["foo", "baz"]),
        ]);

        let summary = Fix::in_dir(dir.path())
            .keep_going()
            .apply(&set, &mut std::io::sink())
            .unwrap();

        assert_eq!(summary.changed_count(), 1);
        assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "baz");
    }

    #[test]
    fn test_description_file_is_never_rewritten() {
        let dir = TempDir::new().unwrap();
        let tdf = dir.path().join("tdf.yml");
        fs::write(&tdf, "foo").unwrap();
        fs::write(dir.path().join("a.yml"), "foo").unwrap();
        let set = TransformationSet::new(vec![
            Transformation::new("*.yml").procedure("Replace", ["foo", "baz"]),
        ]);

        let summary = Fix::in_dir(dir.path())
            .description(&tdf)
            .apply(&set, &mut std::io::sink())
            .unwrap();

        assert_eq!(summary.total, 1);
        assert_eq!(fs::read_to_string(&tdf).unwrap(), "foo");
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = Fix::in_dir(dir.path().join("absent"))
            .apply(&TransformationSet::default(), &mut std::io::sink())
            .unwrap_err();
        assert!(matches!(err, SeedError::RootNotFound(_)));
    }

    #[test]
    fn test_description_skipped_under_relative_root() {
        let cwd = std::env::current_dir().unwrap();
        let dir = TempDir::new_in(&cwd).unwrap();
        let tdf = dir.path().join("tdf.yml");
        fs::write(&tdf, "foo").unwrap();
        fs::write(dir.path().join("a.yml"), "foo").unwrap();
        let set = TransformationSet::new(vec![
            Transformation::new("*.yml").procedure("Replace", ["foo", "baz"]),
        ]);

        let relative = dir.path().strip_prefix(&cwd).unwrap().to_path_buf();
        let mut out = Vec::new();
        let summary = Fix::in_dir(&relative)
            .description(absolute(&tdf))
            .apply(&set, &mut out)
            .unwrap();

        assert_eq!(summary.total, 1);
        assert_eq!(summary.changed_count(), 1);
        assert_eq!(fs::read_to_string(&tdf).unwrap(), "foo");
        assert_eq!(fs::read_to_string(dir.path().join("a.yml")).unwrap(), "baz");

        let name = relative.file_name().unwrap().to_string_lossy().into_owned();
        let report = String::from_utf8(out).unwrap();
        assert!(report.contains(&format!("{name} fixed 1/1 files in ")));
    }

    #[test]
    fn test_label_is_root_base_name() {
        assert_eq!(label(Path::new("/work/project")), "project");
    }
}
