//! Built-in rewrite procedures and the name registry that resolves them.

use super::Rewrite;
use crate::error::{Result, SeedError};
use regex::bytes::{NoExpand, Regex};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builds a rewrite from the string parameters of a procedure call.
pub type ProcedureFactory = Arc<dyn Fn(&[String]) -> Result<Box<dyn Rewrite>> + Send + Sync>;

/// Maps procedure names to rewrite factories.
#[derive(Clone)]
pub struct ProcedureRegistry {
    factories: BTreeMap<String, ProcedureFactory>,
}

impl ProcedureRegistry {
    /// Creates a registry with no procedures.
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registers (or replaces) a procedure.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&[String]) -> Result<Box<dyn Rewrite>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// Looks a procedure up by name.
    pub fn lookup(&self, name: &str) -> Result<&ProcedureFactory> {
        self.factories
            .get(name)
            .ok_or_else(|| SeedError::UnknownProcedure(name.to_string()))
    }

    /// Resolves a procedure call into a rewrite.
    pub fn build(&self, name: &str, params: &[String]) -> Result<Box<dyn Rewrite>> {
        let factory = self.lookup(name)?;
        factory(params).map_err(|e| match e {
            SeedError::Arity {
                expected, found, ..
            } => SeedError::Arity {
                name: name.to_string(),
                expected,
                found,
            },
            other => other,
        })
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl Default for ProcedureRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register("Replace", |p| {
                let [needle, replacement] = params::<2>(p)?;
                Ok(Box::new(TextProcedure::replace(needle, replacement)?) as Box<dyn Rewrite>)
            })
            .register("ReplaceRegex", |p| {
                let [pattern, replacement] = params::<2>(p)?;
                Ok(Box::new(TextProcedure::replace_regex(pattern, replacement)?) as Box<dyn Rewrite>)
            })
            .register("DeleteLines", |p| {
                let [pattern] = params::<1>(p)?;
                Ok(Box::new(TextProcedure::delete_lines(pattern)?) as Box<dyn Rewrite>)
            })
            .register("InsertBefore", |p| {
                let [pattern, text] = params::<2>(p)?;
                Ok(Box::new(TextProcedure::insert_before(pattern, text)?) as Box<dyn Rewrite>)
            })
            .register("InsertAfter", |p| {
                let [pattern, text] = params::<2>(p)?;
                Ok(Box::new(TextProcedure::insert_after(pattern, text)?) as Box<dyn Rewrite>)
            })
            .register("Prepend", |p| {
                let [text] = params::<1>(p)?;
                Ok(Box::new(TextProcedure::prepend(text)) as Box<dyn Rewrite>)
            })
            .register("Append", |p| {
                let [text] = params::<1>(p)?;
                Ok(Box::new(TextProcedure::append(text)) as Box<dyn Rewrite>)
            });
        registry
    }
}

fn params<const N: usize>(params: &[String]) -> Result<[&str; N]> {
    if params.len() != N {
        return Err(SeedError::Arity {
            name: String::new(),
            expected: N,
            found: params.len(),
        });
    }
    Ok(std::array::from_fn(|i| params[i].as_str()))
}

/// Byte-level text rewrites.
pub struct TextProcedure {
    kind: TextProcedureKind,
}

enum TextProcedureKind {
    Replace { needle: Regex, replacement: Vec<u8> },
    ReplaceRegex { pattern: Regex, replacement: Vec<u8> },
    DeleteLines { pattern: Regex },
    InsertBefore { pattern: Regex, content: Vec<u8> },
    InsertAfter { pattern: Regex, content: Vec<u8> },
    Prepend { content: Vec<u8> },
    Append { content: Vec<u8> },
}

impl TextProcedure {
    /// Replaces every non-overlapping occurrence of `needle`, left to right,
    /// without rescanning inserted text.
    pub fn replace(needle: &str, replacement: &str) -> Result<Self> {
        if needle.is_empty() {
            return Err(SeedError::InvalidParam {
                name: "Replace".into(),
                message: "the text to replace must not be empty".into(),
            });
        }
        Ok(Self {
            kind: TextProcedureKind::Replace {
                needle: Regex::new(&regex::escape(needle))?,
                replacement: replacement.as_bytes().to_vec(),
            },
        })
    }

    /// Regex replacement; `$1` and `${name}` expand capture groups.
    pub fn replace_regex(pattern: &str, replacement: &str) -> Result<Self> {
        Ok(Self {
            kind: TextProcedureKind::ReplaceRegex {
                pattern: Regex::new(pattern)?,
                replacement: replacement.as_bytes().to_vec(),
            },
        })
    }

    /// Deletes lines matching the pattern.
    pub fn delete_lines(pattern: &str) -> Result<Self> {
        Ok(Self {
            kind: TextProcedureKind::DeleteLines {
                pattern: Regex::new(pattern)?,
            },
        })
    }

    /// Inserts a line before each line matching the pattern.
    pub fn insert_before(pattern: &str, content: &str) -> Result<Self> {
        Ok(Self {
            kind: TextProcedureKind::InsertBefore {
                pattern: Regex::new(pattern)?,
                content: content.as_bytes().to_vec(),
            },
        })
    }

    /// Inserts a line after each line matching the pattern.
    pub fn insert_after(pattern: &str, content: &str) -> Result<Self> {
        Ok(Self {
            kind: TextProcedureKind::InsertAfter {
                pattern: Regex::new(pattern)?,
                content: content.as_bytes().to_vec(),
            },
        })
    }

    /// Adds text at the start of the content.
    pub fn prepend(content: &str) -> Self {
        Self {
            kind: TextProcedureKind::Prepend {
                content: content.as_bytes().to_vec(),
            },
        }
    }

    /// Adds text at the end of the content.
    pub fn append(content: &str) -> Self {
        Self {
            kind: TextProcedureKind::Append {
                content: content.as_bytes().to_vec(),
            },
        }
    }
}

/// Splits content into lines that keep their terminators.
fn lines(content: &[u8]) -> impl Iterator<Item = &[u8]> {
    content.split_inclusive(|&b| b == b'\n')
}

/// Returns the line body and its terminator (`\n`, `\r\n` or nothing).
fn split_terminator(line: &[u8]) -> (&[u8], &[u8]) {
    let cut = if line.ends_with(b"\r\n") {
        line.len() - 2
    } else if line.ends_with(b"\n") {
        line.len() - 1
    } else {
        line.len()
    };
    line.split_at(cut)
}

impl Rewrite for TextProcedure {
    fn apply(&self, content: &[u8]) -> Vec<u8> {
        match &self.kind {
            TextProcedureKind::Replace {
                needle,
                replacement,
            } => needle
                .replace_all(content, NoExpand(replacement))
                .into_owned(),
            TextProcedureKind::ReplaceRegex {
                pattern,
                replacement,
            } => pattern
                .replace_all(content, replacement.as_slice())
                .into_owned(),
            TextProcedureKind::DeleteLines { pattern } => lines(content)
                .filter(|line| !pattern.is_match(split_terminator(line).0))
                .flatten()
                .copied()
                .collect(),
            TextProcedureKind::InsertBefore { pattern, content: text } => {
                let mut result = Vec::with_capacity(content.len());
                for line in lines(content) {
                    let (body, terminator) = split_terminator(line);
                    if pattern.is_match(body) {
                        result.extend_from_slice(text);
                        result.extend_from_slice(if terminator.is_empty() {
                            b"\n".as_slice()
                        } else {
                            terminator
                        });
                    }
                    result.extend_from_slice(line);
                }
                result
            }
            TextProcedureKind::InsertAfter { pattern, content: text } => {
                let mut result = Vec::with_capacity(content.len());
                for line in lines(content) {
                    let (body, terminator) = split_terminator(line);
                    result.extend_from_slice(line);
                    if pattern.is_match(body) {
                        if terminator.is_empty() {
                            result.push(b'\n');
                            result.extend_from_slice(text);
                        } else {
                            result.extend_from_slice(text);
                            result.extend_from_slice(terminator);
                        }
                    }
                }
                result
            }
            TextProcedureKind::Prepend { content: text } => {
                let mut result = Vec::with_capacity(text.len() + content.len());
                result.extend_from_slice(text);
                result.extend_from_slice(content);
                result
            }
            TextProcedureKind::Append { content: text } => {
                let mut result = Vec::with_capacity(text.len() + content.len());
                result.extend_from_slice(content);
                result.extend_from_slice(text);
                result
            }
        }
    }

    fn describe(&self) -> String {
        match &self.kind {
            TextProcedureKind::Replace {
                needle,
                replacement,
            } => format!(
                "Replace '{}' with '{}'",
                needle.as_str(),
                String::from_utf8_lossy(replacement)
            ),
            TextProcedureKind::ReplaceRegex {
                pattern,
                replacement,
            } => format!(
                "Replace pattern '{}' with '{}'",
                pattern.as_str(),
                String::from_utf8_lossy(replacement)
            ),
            TextProcedureKind::DeleteLines { pattern } => {
                format!("Delete lines matching '{}'", pattern.as_str())
            }
            TextProcedureKind::InsertBefore { pattern, .. } => {
                format!("Insert content before lines matching '{}'", pattern.as_str())
            }
            TextProcedureKind::InsertAfter { pattern, .. } => {
                format!("Insert content after lines matching '{}'", pattern.as_str())
            }
            TextProcedureKind::Prepend { content } => {
                format!("Prepend '{}'", String::from_utf8_lossy(content))
            }
            TextProcedureKind::Append { content } => {
                format!("Append '{}'", String::from_utf8_lossy(content))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(name: &str, args: &[&str], content: &str) -> String {
        let params: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let rewrite = ProcedureRegistry::default().build(name, &params).unwrap();
        String::from_utf8(rewrite.apply(content.as_bytes())).unwrap()
    }

    #[test]
    fn test_replace_all_occurrences() {
        assert_eq!(run("Replace", &["x", "y"], "xxy"), "yyy");
        assert_eq!(run("Replace", &["foo", "baz"], "foo bar foo"), "baz bar baz");
    }

    #[test]
    fn test_replace_is_single_pass() {
        // Inserted text is not rescanned.
        assert_eq!(run("Replace", &["a", "aa"], "aba"), "aabaa");
        // Non-overlapping, left to right.
        assert_eq!(run("Replace", &["aa", "b"], "aaa"), "ba");
    }

    #[test]
    fn test_replace_is_idempotent_when_replacement_lacks_needle() {
        let once = run("Replace", &["a", "b"], "banana");
        let twice = run("Replace", &["a", "b"], &once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_replace_treats_needle_and_replacement_literally() {
        assert_eq!(run("Replace", &["a.b", "$1"], "a.b axb"), "$1 axb");
    }

    #[test]
    fn test_replace_works_on_non_utf8_content() {
        let rewrite = ProcedureRegistry::default()
            .build("Replace", &["x".to_string(), "y".to_string()])
            .unwrap();
        assert_eq!(rewrite.apply(&[0xff, b'x', 0xfe]), vec![0xff, b'y', 0xfe]);
    }

    #[test]
    fn test_replace_regex_expands_groups() {
        assert_eq!(
            run("ReplaceRegex", &[r"(\w+)\.unwrap\(\)", "$1.expect(\"checked\")"], "v.unwrap()"),
            "v.expect(\"checked\")"
        );
    }

    #[test]
    fn test_delete_lines_keeps_terminators() {
        assert_eq!(
            run("DeleteLines", &["^import old"], "import old.A;\r\nimport new.B;\r\n"),
            "import new.B;\r\n"
        );
        assert_eq!(run("DeleteLines", &["TODO"], "a\n// TODO\nb"), "a\nb");
    }

    #[test]
    fn test_insert_before_and_after() {
        assert_eq!(
            run("InsertBefore", &["^package", "// header"], "package main\n"),
            "// header\npackage main\n"
        );
        assert_eq!(
            run("InsertAfter", &["^package", "import \"fmt\""], "package main\nfunc f() {}\n"),
            "package main\nimport \"fmt\"\nfunc f() {}\n"
        );
        assert_eq!(
            run("InsertAfter", &["end$", "tail"], "the end"),
            "the end\ntail"
        );
    }

    #[test]
    fn test_prepend_and_append() {
        assert_eq!(run("Prepend", &["// generated\n"], "x"), "// generated\nx");
        assert_eq!(run("Append", &["\n"], "x"), "x\n");
    }

    #[test]
    fn test_unknown_procedure_is_an_error() {
        let err = ProcedureRegistry::default()
            .build("Frobnicate", &[])
            .err()
            .unwrap();
        assert!(matches!(err, SeedError::UnknownProcedure(name) if name == "Frobnicate"));
    }

    #[test]
    fn test_wrong_parameter_count() {
        let err = ProcedureRegistry::default()
            .build("Replace", &["only".to_string()])
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "Replace expects 2 parameter(s), got 1");
    }

    #[test]
    fn test_invalid_parameters() {
        let registry = ProcedureRegistry::default();
        assert!(registry.build("Replace", &["".into(), "x".into()]).is_err());
        assert!(registry.build("ReplaceRegex", &["(".into(), "x".into()]).is_err());
    }

    #[test]
    fn test_custom_procedure() {
        struct Upper;
        impl Rewrite for Upper {
            fn apply(&self, content: &[u8]) -> Vec<u8> {
                content.to_ascii_uppercase()
            }
            fn describe(&self) -> String {
                "Uppercase".into()
            }
        }

        let mut registry = ProcedureRegistry::empty();
        registry.register("Upper", |_| Ok(Box::new(Upper) as Box<dyn Rewrite>));

        assert_eq!(registry.names().collect::<Vec<_>>(), ["Upper"]);
        let rewrite = registry.build("Upper", &[]).unwrap();
        assert_eq!(rewrite.apply(b"abc"), b"ABC");
        assert!(registry.build("Replace", &[]).is_err());
    }
}
