//! Running one file through every transformation of a plan.

use crate::error::{Result, SeedError};
use crate::transform::Plan;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// The content of a file before and after its transformations.
#[derive(Debug, Clone)]
pub struct FileChange {
    pub path: PathBuf,
    pub original: Vec<u8>,
    pub transformed: Vec<u8>,
}

impl FileChange {
    /// Returns true if the content was modified.
    pub fn is_modified(&self) -> bool {
        self.original != self.transformed
    }

    /// Writes the transformed content over the file, keeping its permissions.
    pub fn write(&self) -> Result<()> {
        let io_err = |e| SeedError::io(&self.path, e);

        let permissions = fs::metadata(&self.path).map_err(io_err)?.permissions();
        fs::write(&self.path, &self.transformed).map_err(io_err)?;
        fs::set_permissions(&self.path, permissions).map_err(io_err)
    }
}

/// Runs `path` through every transformation of `plan`, in order.
///
/// The file is read once, when the first transformation matches it; a file no
/// transformation matches is never read and yields `None`. Preconditions see
/// the content as rewritten by the earlier transformations.
pub fn process(path: &Path, plan: &Plan) -> Result<Option<FileChange>> {
    let mut original: Option<Vec<u8>> = None;
    let mut current = Vec::new();

    for transformation in plan.transformations() {
        if !transformation.matches(path) {
            continue;
        }

        if original.is_none() {
            let data = fs::read(path).map_err(|e| SeedError::io(path, e))?;
            current.clone_from(&data);
            original = Some(data);
        }

        if transformation.satisfies(&current) {
            trace!(
                path = %path.display(),
                transformation = transformation.index() + 1,
                "applying"
            );
            current = transformation.apply(std::mem::take(&mut current));
        } else {
            debug!(
                path = %path.display(),
                transformation = transformation.index() + 1,
                "preconditions not met"
            );
        }
    }

    Ok(original.map(|original| FileChange {
        path: path.to_path_buf(),
        original,
        transformed: current,
    }))
}
