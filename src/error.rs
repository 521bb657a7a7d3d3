//! Error types for the transformation engine.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for seed operations.
#[derive(Error, Debug)]
pub enum SeedError {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk {}: {message}", .path.display())]
    Walk { path: PathBuf, message: String },

    #[error("Glob pattern error: {0}")]
    Glob(#[from] globset::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Invalid transformation description:\n{}", render_issues(.0))]
    Config(Vec<ConfigIssue>),

    #[error("Unknown procedure: {0}")]
    UnknownProcedure(String),

    #[error("Unknown precondition: {0}")]
    UnknownPrecondition(String),

    #[error("{name} expects {expected} parameter(s), got {found}")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Invalid parameter for {name}: {message}")]
    InvalidParam { name: String, message: String },

    #[error("Format not supported: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to parse {format} description: {message}")]
    Parse { format: String, message: String },

    #[error("Failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Root directory not found: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(String),

    #[error("Failed to write report: {0}")]
    Report(#[source] std::io::Error),
}

impl SeedError {
    /// Wraps an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SeedError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A configuration problem attributed to one transformation of a set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Zero-based index of the transformation in the description.
    pub transformation: usize,
    pub message: String,
}

impl ConfigIssue {
    pub fn new(transformation: usize, message: impl Into<String>) -> Self {
        Self {
            transformation,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transformation #{}: {}", self.transformation + 1, self.message)
    }
}

fn render_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("  {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A specialized Result type for seed operations.
pub type Result<T> = std::result::Result<T, SeedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_lists_every_issue() {
        let err = SeedError::Config(vec![
            ConfigIssue::new(0, "Unknown procedure: Frobnicate"),
            ConfigIssue::new(2, "Unknown precondition: Maybe"),
        ]);
        let text = err.to_string();

        assert!(text.contains("transformation #1: Unknown procedure: Frobnicate"));
        assert!(text.contains("transformation #3: Unknown precondition: Maybe"));
    }

    #[test]
    fn test_io_error_names_path() {
        let err = SeedError::io(
            "/tmp/missing.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("/tmp/missing.txt"));
    }
}
