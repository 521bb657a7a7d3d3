//! Transformation description documents and run parameters.
//!
//! A description document lists the transformations to apply to a tree. It
//! can be written in YAML, TOML or JSON:
//!
//! ```yaml
//! exclude: "target|.git"
//! transformations:
//!   - filter: "*.go|*.yml|!*_test.go"
//!     pre:
//!       - Contains(org.seedstack)
//!     proc:
//!       - name: Replace
//!         params: ["org.seedstack.seed", "org.seedstack.business"]
//! ```
//!
//! YAML and JSON documents may also be a bare list of transformations, in
//! which case nothing is excluded from the walk. A transformation can list
//! extra exclusions under its own `exclude` key instead of `!` patterns.

pub mod source;

pub use source::{DescriptionSource, Format};

use crate::error::{Result, SeedError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The parsed content of a transformation description document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransformationSet {
    /// `|`-separated glob patterns for directories and files skipped by the walk.
    #[serde(default, alias = "Exclude")]
    pub exclude: String,

    /// Transformations, applied to every file in declared order.
    #[serde(default, alias = "Transformations")]
    pub transformations: Vec<Transformation>,
}

/// One rewrite rule: which files, under which conditions, and how.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Transformation {
    /// `|`-separated base-name globs; a leading `!` marks an exclusion.
    #[serde(default, alias = "Filter", alias = "Include")]
    pub filter: String,

    /// Extra `|`-separated base-name globs excluded from this transformation.
    #[serde(default, alias = "Exclude", skip_serializing_if = "String::is_empty")]
    pub exclude: String,

    /// Names of the preconditions that must all hold, e.g. `Contains(foo)`.
    #[serde(default, alias = "Pre", alias = "preconditions")]
    pub pre: Vec<String>,

    /// Procedures applied in order when the preconditions hold.
    #[serde(default, alias = "Proc", alias = "procedures")]
    pub proc: Vec<Procedure>,
}

/// A call to a registered rewrite procedure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Procedure {
    #[serde(alias = "Name")]
    pub name: String,

    #[serde(default, alias = "Params")]
    pub params: Vec<String>,
}

impl Procedure {
    pub fn new(name: impl Into<String>, params: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }
}

impl Transformation {
    /// Creates a transformation applying to files matching `filter`.
    pub fn new(filter: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            ..Default::default()
        }
    }

    /// Excludes files matching `patterns` from this transformation.
    pub fn exclude(mut self, patterns: impl Into<String>) -> Self {
        self.exclude = patterns.into();
        self
    }

    /// Adds a precondition.
    pub fn pre(mut self, name: impl Into<String>) -> Self {
        self.pre.push(name.into());
        self
    }

    /// Adds a procedure.
    pub fn procedure(
        mut self,
        name: impl Into<String>,
        params: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.proc.push(Procedure::new(name, params));
        self
    }
}

impl TransformationSet {
    /// Creates a set from a list of transformations with nothing excluded.
    pub fn new(transformations: Vec<Transformation>) -> Self {
        Self {
            exclude: String::new(),
            transformations,
        }
    }

    /// Sets the walk exclusion patterns.
    pub fn with_exclude(mut self, exclude: impl Into<String>) -> Self {
        self.exclude = exclude.into();
        self
    }

    /// Parses a description document.
    pub fn parse(data: &[u8], format: Format) -> Result<Self> {
        let parse_err = |message: String| SeedError::Parse {
            format: format.to_string(),
            message,
        };

        match format {
            Format::Yaml => {
                let value: serde_yaml::Value =
                    serde_yaml::from_slice(data).map_err(|e| parse_err(e.to_string()))?;
                if value.is_sequence() {
                    let list: Vec<Transformation> =
                        serde_yaml::from_value(value).map_err(|e| parse_err(e.to_string()))?;
                    Ok(Self::new(list))
                } else if value.is_null() {
                    Ok(Self::default())
                } else {
                    serde_yaml::from_value(value).map_err(|e| parse_err(e.to_string()))
                }
            }
            Format::Json => {
                let value: serde_json::Value =
                    serde_json::from_slice(data).map_err(|e| parse_err(e.to_string()))?;
                if value.is_array() {
                    let list: Vec<Transformation> =
                        serde_json::from_value(value).map_err(|e| parse_err(e.to_string()))?;
                    Ok(Self::new(list))
                } else {
                    serde_json::from_value(value).map_err(|e| parse_err(e.to_string()))
                }
            }
            Format::Toml => {
                let text = std::str::from_utf8(data).map_err(|e| parse_err(e.to_string()))?;
                toml::from_str(text).map_err(|e| parse_err(e.to_string()))
            }
        }
    }

    /// Serializes the set in the given format.
    pub fn render(&self, format: Format) -> Result<String> {
        let ser_err = |message: String| SeedError::Parse {
            format: format.to_string(),
            message,
        };

        match format {
            Format::Yaml => serde_yaml::to_string(self).map_err(|e| ser_err(e.to_string())),
            Format::Json => serde_json::to_string_pretty(self).map_err(|e| ser_err(e.to_string())),
            Format::Toml => toml::to_string(self).map_err(|e| ser_err(e.to_string())),
        }
    }

    /// Loads and parses a description from a file or URL.
    pub fn load(source: &DescriptionSource) -> Result<Self> {
        let data = source.read()?;
        Self::parse(&data, source.format()?)
    }
}

/// Immutable parameters of one fix run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Absolute path of the directory to transform.
    pub root: PathBuf,
    /// Absolute path of the description file, excluded from the walk.
    pub description: Option<PathBuf>,
    /// Worker pool size. `None` uses the available parallelism.
    pub jobs: Option<usize>,
    /// Compute changes without writing them.
    pub dry_run: bool,
    /// Disable broken transformations instead of aborting the run.
    pub keep_going: bool,
}

impl RunConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            description: None,
            jobs: None,
            dry_run: false,
            keep_going: false,
        }
    }

    /// Number of worker threads to use.
    pub fn worker_count(&self) -> usize {
        self.jobs
            .filter(|&n| n > 0)
            .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()))
            .unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml_set() {
        let yaml = r#"
exclude: "target|.git"
transformations:
  - filter: "*.go|*.yml"
    pre: [AlwaysTrue]
    proc:
      - name: Replace
        params: ["old", "new"]
"#;
        let set = TransformationSet::parse(yaml.as_bytes(), Format::Yaml).unwrap();

        assert_eq!(set.exclude, "target|.git");
        assert_eq!(set.transformations.len(), 1);
        assert_eq!(set.transformations[0].pre, vec!["AlwaysTrue"]);
        assert_eq!(
            set.transformations[0].proc[0],
            Procedure::new("Replace", ["old", "new"])
        );
    }

    #[test]
    fn test_parse_capitalised_keys() {
        let yaml = r#"
Exclude: "*.out"
Transformations:
  - Filter: "*.java"
    Pre: [AlwaysTrue]
    Proc:
      - Name: Replace
        Params: ["a", "b"]
"#;
        let set = TransformationSet::parse(yaml.as_bytes(), Format::Yaml).unwrap();

        assert_eq!(set.exclude, "*.out");
        assert_eq!(set.transformations[0].filter, "*.java");
        assert_eq!(set.transformations[0].proc[0].params, vec!["a", "b"]);
    }

    #[test]
    fn test_parse_bare_yaml_list() {
        let yaml = r#"
- Include: "*.go|*.yml"
  pre: [AlwaysTrue]
  proc:
    - Name: Replace
      Params: ["old", "new"]
"#;
        let set = TransformationSet::parse(yaml.as_bytes(), Format::Yaml).unwrap();

        assert!(set.exclude.is_empty());
        assert_eq!(set.transformations[0].filter, "*.go|*.yml");
    }

    #[test]
    fn test_parse_include_exclude_pair() {
        let yaml = r#"
- Include: "*.go|*.yml"
  Exclude: "*.out"
  Proc:
    - Name: Replace
      Params: ["old", "new"]
"#;
        let set = TransformationSet::parse(yaml.as_bytes(), Format::Yaml).unwrap();

        assert_eq!(set.transformations[0].filter, "*.go|*.yml");
        assert_eq!(set.transformations[0].exclude, "*.out");
    }

    #[test]
    fn test_misspelled_top_level_key_is_rejected() {
        let yaml = r#"
exclude: target
transformation:
  - filter: "*.txt"
    proc:
      - name: Replace
        params: ["foo", "bar"]
"#;
        let err = TransformationSet::parse(yaml.as_bytes(), Format::Yaml).unwrap_err();
        assert!(matches!(err, SeedError::Parse { ref format, .. } if format == "yaml"));
        assert!(err.to_string().contains("transformation"));

        let toml = "[[transformation]]\nfilter = \"*.txt\"\n";
        let err = TransformationSet::parse(toml.as_bytes(), Format::Toml).unwrap_err();
        assert!(matches!(err, SeedError::Parse { .. }));
    }

    #[test]
    fn test_unknown_transformation_key_is_rejected() {
        let yaml = "- filter: \"*.rs\"\n  procs: []\n";
        let err = TransformationSet::parse(yaml.as_bytes(), Format::Yaml).unwrap_err();
        assert!(matches!(err, SeedError::Parse { .. }));
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
exclude = "target"

[[transformations]]
filter = "*.rs"
pre = ["Contains(foo)"]

[[transformations.proc]]
name = "Replace"
params = ["foo", "bar"]
"#;
        let set = TransformationSet::parse(toml.as_bytes(), Format::Toml).unwrap();

        assert_eq!(set.exclude, "target");
        assert_eq!(set.transformations[0].proc[0].name, "Replace");
    }

    #[test]
    fn test_yaml_to_toml_conversion() {
        let set = TransformationSet::new(vec![
            Transformation::new("*.txt")
                .exclude("*.bak")
                .pre("AlwaysTrue")
                .procedure("Replace", ["foo", "baz"]),
        ])
        .with_exclude(".git");

        let toml = set.render(Format::Toml).unwrap();
        let back = TransformationSet::parse(toml.as_bytes(), Format::Toml).unwrap();

        assert_eq!(back, set);
    }

    #[test]
    fn test_malformed_document() {
        let err = TransformationSet::parse(b"{ not json", Format::Json).unwrap_err();
        assert!(err.to_string().contains("json"));
    }

    #[test]
    fn test_worker_count_ignores_zero() {
        let mut config = RunConfig::new("/tmp");
        config.jobs = Some(0);
        assert!(config.worker_count() >= 1);

        config.jobs = Some(3);
        assert_eq!(config.worker_count(), 3);
    }
}
