//! File selection: transformation filters and the tree walker.
//!
//! A filter is a `|`-separated list of glob patterns matched against a file's
//! base name. Patterns starting with `!` exclude; all others include:
//!
//! ```
//! use seed::matcher::Filter;
//!
//! let filter = Filter::parse("*.go|*.yml|!*_test.go").unwrap();
//! assert!(filter.matches("src/main.go"));
//! assert!(filter.matches("config.yml"));
//! assert!(!filter.matches("src/main_test.go"));
//! assert!(!filter.matches("README.md"));
//! ```

pub mod walk;

pub use walk::{walk, WalkResult, Walker};

use crate::error::{Result, SeedError};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::Path;

const DELIMITER: char = '|';
const NEGATION: char = '!';

/// A compiled set of base-name glob patterns.
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<String>,
    set: GlobSet,
}

impl PatternSet {
    /// Compiles a `|`-separated list of glob patterns. Empty segments are ignored.
    pub fn parse(expr: &str) -> Result<Self> {
        Self::from_patterns(split(expr).map(str::to_string).collect())
    }

    fn from_patterns(patterns: Vec<String>) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &patterns {
            if pattern.contains('/') {
                return Err(SeedError::InvalidParam {
                    name: "filter".into(),
                    message: format!(
                        "pattern '{pattern}' contains '/', but patterns match base names only"
                    ),
                });
            }
            builder.add(GlobBuilder::new(pattern).literal_separator(false).build()?);
        }
        Ok(Self {
            set: builder.build()?,
            patterns,
        })
    }

    /// Returns true if no pattern was given.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Returns the source patterns.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Tests a base name against every pattern.
    pub fn is_match(&self, name: &str) -> bool {
        self.set.is_match(name)
    }
}

impl Default for PatternSet {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            set: GlobSet::empty(),
        }
    }
}

/// The include/exclude filter of one transformation.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    include: PatternSet,
    exclude: PatternSet,
}

impl Filter {
    /// Parses a filter expression such as `"*.go|*.yml|!*.out"`.
    pub fn parse(expr: &str) -> Result<Self> {
        Self::parse_with_exclude(expr, "")
    }

    /// Parses a filter expression plus a separate list of exclusions, as
    /// written with an `include`/`exclude` key pair. A `!` prefix in
    /// `excluded` is accepted and ignored.
    pub fn parse_with_exclude(expr: &str, excluded: &str) -> Result<Self> {
        let mut include = Vec::new();
        let mut exclude: Vec<String> = split(excluded)
            .map(|p| p.strip_prefix(NEGATION).unwrap_or(p).trim())
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();

        for pattern in split(expr) {
            match pattern.strip_prefix(NEGATION) {
                Some(negated) => {
                    let negated = negated.trim();
                    if negated.is_empty() {
                        return Err(SeedError::InvalidParam {
                            name: "filter".into(),
                            message: format!("empty exclusion in '{expr}'"),
                        });
                    }
                    exclude.push(negated.to_string());
                }
                None => include.push(pattern.to_string()),
            }
        }

        Ok(Self {
            include: PatternSet::from_patterns(include)?,
            exclude: PatternSet::from_patterns(exclude)?,
        })
    }

    /// Tests whether a path is in scope.
    ///
    /// Only the base name is considered. Exclusions win over inclusions and an
    /// empty include set matches everything.
    pub fn matches(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());

        if self.exclude.is_match(&name) {
            return false;
        }
        self.include.is_empty() || self.include.is_match(&name)
    }

    pub fn include(&self) -> &PatternSet {
        &self.include
    }

    pub fn exclude(&self) -> &PatternSet {
        &self.exclude
    }
}

fn split(expr: &str) -> impl Iterator<Item = &str> {
    expr.split(DELIMITER)
        .map(str::trim)
        .filter(|p| !p.is_empty())
}
