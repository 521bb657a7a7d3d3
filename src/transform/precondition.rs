//! Content predicates gating whether a transformation's procedures run.
//!
//! A precondition is written `Name` or `Name(argument)`:
//!
//! ```
//! use seed::transform::PreconditionRegistry;
//!
//! let registry = PreconditionRegistry::default();
//! let contains = registry.build("Contains(org.seedstack)").unwrap();
//! assert!(contains.check(b"import org.seedstack.seed;"));
//! assert!(registry.build("Probably").is_err());
//! ```

use crate::error::{Result, SeedError};
use regex::bytes::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A named test over file content.
pub trait Predicate: Send + Sync {
    fn check(&self, content: &[u8]) -> bool;
}

impl<F> Predicate for F
where
    F: Fn(&[u8]) -> bool + Send + Sync,
{
    fn check(&self, content: &[u8]) -> bool {
        self(content)
    }
}

/// Builds a predicate from the optional argument of a precondition.
pub type PreconditionFactory =
    Arc<dyn Fn(Option<&str>) -> Result<Box<dyn Predicate>> + Send + Sync>;

/// Maps precondition names to predicate factories.
#[derive(Clone)]
pub struct PreconditionRegistry {
    factories: BTreeMap<String, PreconditionFactory>,
}

impl PreconditionRegistry {
    /// Creates a registry with no preconditions.
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registers (or replaces) a precondition.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(Option<&str>) -> Result<Box<dyn Predicate>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// Looks a precondition up by name.
    pub fn lookup(&self, name: &str) -> Result<&PreconditionFactory> {
        self.factories
            .get(name)
            .ok_or_else(|| SeedError::UnknownPrecondition(name.to_string()))
    }

    /// Parses and resolves a precondition expression.
    pub fn build(&self, expr: &str) -> Result<Box<dyn Predicate>> {
        let (name, argument) = parse(expr)?;
        let factory = self.lookup(name)?;
        factory(argument).map_err(|e| match e {
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

    /// Evaluates a precondition expression directly.
    ///
    /// Anything that does not resolve evaluates to `false`.
    pub fn evaluate(&self, expr: &str, content: &[u8]) -> bool {
        match self.build(expr) {
            Ok(predicate) => predicate.check(content),
            Err(e) => {
                tracing::warn!(precondition = expr, error = %e, "precondition failed closed");
                false
            }
        }
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl Default for PreconditionRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register("AlwaysTrue", |arg| {
                no_argument(arg)?;
                Ok(Box::new(|_: &[u8]| true) as Box<dyn Predicate>)
            })
            .register("AlwaysFalse", |arg| {
                no_argument(arg)?;
                Ok(Box::new(|_: &[u8]| false) as Box<dyn Predicate>)
            })
            .register("Contains", |arg| {
                let needle = literal(required("Contains", arg)?)?;
                Ok(Box::new(move |c: &[u8]| needle.is_match(c)) as Box<dyn Predicate>)
            })
            .register("NotContains", |arg| {
                let needle = literal(required("NotContains", arg)?)?;
                Ok(Box::new(move |c: &[u8]| !needle.is_match(c)) as Box<dyn Predicate>)
            })
            .register("Matches", |arg| {
                let pattern = Regex::new(required("Matches", arg)?)?;
                Ok(Box::new(move |c: &[u8]| pattern.is_match(c)) as Box<dyn Predicate>)
            })
            .register("NotMatches", |arg| {
                let pattern = Regex::new(required("NotMatches", arg)?)?;
                Ok(Box::new(move |c: &[u8]| !pattern.is_match(c)) as Box<dyn Predicate>)
            });
        registry
    }
}

/// Splits `Name(argument)` into its parts.
fn parse(expr: &str) -> Result<(&str, Option<&str>)> {
    let expr = expr.trim();
    let Some(open) = expr.find('(') else {
        return Ok((expr, None));
    };

    match expr.strip_suffix(')') {
        Some(inner) => Ok((expr[..open].trim_end(), Some(&inner[open + 1..]))),
        None => Err(SeedError::InvalidParam {
            name: expr[..open].to_string(),
            message: format!("unterminated argument in '{expr}'"),
        }),
    }
}

fn no_argument(arg: Option<&str>) -> Result<()> {
    match arg {
        None => Ok(()),
        Some(_) => Err(SeedError::Arity {
            name: String::new(),
            expected: 0,
            found: 1,
        }),
    }
}

fn required<'a>(name: &str, arg: Option<&'a str>) -> Result<&'a str> {
    match arg {
        Some(arg) if !arg.is_empty() => Ok(arg),
        Some(_) => Err(SeedError::InvalidParam {
            name: name.to_string(),
            message: "argument must not be empty".into(),
        }),
        None => Err(SeedError::Arity {
            name: String::new(),
            expected: 1,
            found: 0,
        }),
    }
}

fn literal(text: &str) -> Result<Regex> {
    Ok(Regex::new(&regex::escape(text))?)
}
