//! Fan-out/fan-in processing of a file list on a bounded worker pool.

use crate::error::{Result, SeedError};
use crate::processor::{self, FileChange};
use crate::transform::Plan;
use rayon::ThreadPoolBuilder;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Outcome of one run over a file list.
#[derive(Debug)]
pub struct RunSummary {
    /// Name shown in the summary line, usually the root directory's base name.
    pub label: String,
    /// Files whose content changed, sorted.
    pub changed: Vec<PathBuf>,
    /// Number of files considered.
    pub total: usize,
    /// Per-file and per-directory errors. None of them stopped the run.
    pub failures: Vec<SeedError>,
    /// Changes computed but not written (dry runs only).
    pub previews: Vec<FileChange>,
    pub elapsed: Duration,
}

impl RunSummary {
    fn new(label: String, total: usize) -> Self {
        Self {
            label,
            changed: Vec::new(),
            total,
            failures: Vec::new(),
            previews: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Returns the number of files that were rewritten.
    pub fn changed_count(&self) -> usize {
        self.changed.len()
    }

    /// Returns true if nothing failed.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} fixed {}/{} files in {:?}",
            self.label,
            self.changed.len(),
            self.total,
            self.elapsed
        )
    }
}

/// Completion signal sent by a worker for one file.
enum Completion {
    Unchanged(PathBuf),
    Changed(FileChange),
    Failed(SeedError),
}

/// Runs the file processor over many files in parallel and writes the results.
#[derive(Debug, Clone)]
pub struct Driver {
    workers: usize,
    dry_run: bool,
    label: String,
    started: Option<Instant>,
}

impl Driver {
    /// Creates a driver with a pool of `workers` threads (at least one).
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            dry_run: false,
            label: ".".to_string(),
            started: None,
        }
    }

    /// Computes changes without writing them.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sets the name used in the summary line.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Measures the summary duration from `started` instead of from the call
    /// to [`Driver::run`].
    pub fn started(mut self, started: Instant) -> Self {
        self.started = Some(started);
        self
    }

    /// Processes every path and blocks until all of them completed.
    ///
    /// Progress is written to `out`: a header before the first changed file,
    /// then one line per changed file, then the summary line. Per-file errors
    /// are collected in the summary rather than returned.
    pub fn run(&self, paths: &[PathBuf], plan: &Plan, out: &mut dyn Write) -> Result<RunSummary> {
        let started = self.started.unwrap_or_else(Instant::now);
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("seed-worker-{i}"))
            .build()
            .map_err(|e| SeedError::ThreadPool(e.to_string()))?;

        debug!(files = paths.len(), workers = self.workers, "processing files");

        // One slot per file: workers never block on send, even if the
        // receiving side stops early.
        let (done_tx, done_rx) = crossbeam_channel::bounded(paths.len());
        let mut summary = RunSummary::new(self.label.clone(), paths.len());

        pool.in_place_scope(|scope| -> Result<()> {
            for path in paths {
                let done_tx = done_tx.clone();
                scope.spawn(move |_| {
                    let completion = self.process_one(path, plan);
                    let _ = done_tx.send(completion);
                });
            }
            drop(done_tx);

            for completion in done_rx.iter() {
                self.record(completion, &mut summary, out)?;
            }
            Ok(())
        })?;

        summary.changed.sort();
        summary.previews.sort_by(|a, b| a.path.cmp(&b.path));
        summary.elapsed = started.elapsed();
        writeln!(out, "\n{summary}").map_err(SeedError::Report)?;

        Ok(summary)
    }

    fn process_one(&self, path: &Path, plan: &Plan) -> Completion {
        match processor::process(path, plan) {
            Ok(Some(change)) if change.is_modified() => {
                if !self.dry_run
                    && let Err(e) = change.write()
                {
                    return Completion::Failed(e);
                }
                Completion::Changed(change)
            }
            Ok(_) => Completion::Unchanged(path.to_path_buf()),
            Err(e) => Completion::Failed(e),
        }
    }

    fn record(
        &self,
        completion: Completion,
        summary: &mut RunSummary,
        out: &mut dyn Write,
    ) -> Result<()> {
        match completion {
            Completion::Unchanged(path) => {
                debug!(path = %path.display(), "unchanged");
            }
            Completion::Changed(change) => {
                if summary.changed.is_empty() {
                    writeln!(out, "Apply transformations:").map_err(SeedError::Report)?;
                }
                writeln!(out, "{}", change.path.display()).map_err(SeedError::Report)?;
                info!(path = %change.path.display(), dry_run = self.dry_run, "rewritten");

                summary.changed.push(change.path.clone());
                if self.dry_run {
                    summary.previews.push(change);
                }
            }
            Completion::Failed(error) => {
                warn!(%error, "file not processed");
                summary.failures.push(error);
            }
        }
        Ok(())
    }
}
