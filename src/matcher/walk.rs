//! Recursive enumeration of the files to process.

use super::PatternSet;
use crate::config::source::absolute;
use crate::error::{Result, SeedError};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Files found under a root, plus the directories that could not be read.
#[derive(Debug, Default)]
pub struct WalkResult {
    /// Regular files, sorted.
    pub files: Vec<PathBuf>,
    /// Per-entry failures. The walk continues past them.
    pub errors: Vec<SeedError>,
}

/// Collects every regular file under a root directory.
#[derive(Debug, Clone, Default)]
pub struct Walker {
    exclude: PatternSet,
    skip: Option<PathBuf>,
}

impl Walker {
    /// Creates a walker that lists everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Skips directories and files whose base name matches `patterns`.
    pub fn exclude(mut self, patterns: PatternSet) -> Self {
        self.exclude = patterns;
        self
    }

    /// Never lists `path`. Both it and the walked files are compared as
    /// absolute, normalized paths.
    pub fn skip_file(mut self, path: impl AsRef<Path>) -> Self {
        self.skip = Some(normalize(&absolute(path.as_ref())));
        self
    }

    /// Walks `root`. Fails only when the root itself is not a directory.
    pub fn walk(&self, root: &Path) -> Result<WalkResult> {
        if !root.is_dir() {
            return Err(SeedError::RootNotFound(root.to_path_buf()));
        }

        let base = absolute(root);
        let mut result = WalkResult::default();
        let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
            entry.depth() == 0 || !self.exclude.is_match(&entry.file_name().to_string_lossy())
        });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(root).to_path_buf();
                    warn!(path = %path.display(), error = %e, "skipping unreadable entry");
                    result.errors.push(SeedError::Walk {
                        path,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.into_path();
            if let Some(skip) = &self.skip
                && let Ok(relative) = path.strip_prefix(root)
                && *skip == normalize(&base.join(relative))
            {
                debug!(path = %path.display(), "skipping description file");
                continue;
            }
            result.files.push(path);
        }

        result.files.sort();
        Ok(result)
    }
}

/// Lists the files under `root`, honouring the set-level `exclude` patterns
/// and leaving out the description file.
pub fn walk(root: &Path, exclude: &str, description: Option<&Path>) -> Result<WalkResult> {
    let mut walker = Walker::new().exclude(PatternSet::parse(exclude)?);
    if let Some(description) = description {
        walker = walker.skip_file(description);
    }
    walker.walk(root)
}

/// Lexically removes `.` and resolves `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
