//! Compiling transformation descriptions into executable rewrites.

pub mod precondition;
pub mod procedure;

pub use precondition::{Predicate, PreconditionRegistry};
pub use procedure::{ProcedureRegistry, TextProcedure};

use crate::config::{Transformation, TransformationSet};
use crate::error::{ConfigIssue, Result, SeedError};
use crate::matcher::Filter;
use std::path::Path;
use tracing::{error, trace};

/// A content rewrite produced by a registered procedure.
pub trait Rewrite: Send + Sync {
    /// Rewrites the content, returning the new buffer.
    fn apply(&self, content: &[u8]) -> Vec<u8>;

    /// Returns a description of the rewrite.
    fn describe(&self) -> String;
}

/// One transformation with its filter, preconditions and procedures resolved.
pub struct CompiledTransformation {
    index: usize,
    filter: Filter,
    preconditions: Vec<Box<dyn Predicate>>,
    procedures: Vec<Box<dyn Rewrite>>,
}

impl CompiledTransformation {
    /// Resolves every name of `transformation`, reporting each problem found.
    pub fn compile(
        index: usize,
        transformation: &Transformation,
        procedures: &ProcedureRegistry,
        preconditions: &PreconditionRegistry,
    ) -> std::result::Result<Self, Vec<ConfigIssue>> {
        let mut issues = Vec::new();
        let mut record = |err: SeedError| issues.push(ConfigIssue::new(index, err.to_string()));

        let filter = Filter::parse_with_exclude(&transformation.filter, &transformation.exclude)
            .map_err(&mut record)
            .ok();

        let mut compiled_pre = Vec::with_capacity(transformation.pre.len());
        for name in &transformation.pre {
            match preconditions.build(name) {
                Ok(predicate) => compiled_pre.push(predicate),
                Err(e) => record(e),
            }
        }

        let mut compiled_proc = Vec::with_capacity(transformation.proc.len());
        for procedure in &transformation.proc {
            match procedures.build(&procedure.name, &procedure.params) {
                Ok(rewrite) => compiled_proc.push(rewrite),
                Err(e) => record(e),
            }
        }

        match filter {
            Some(filter) if issues.is_empty() => Ok(Self {
                index,
                filter,
                preconditions: compiled_pre,
                procedures: compiled_proc,
            }),
            _ => Err(issues),
        }
    }

    /// Position of the transformation in its description.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Tests whether the file's base name passes the filter.
    pub fn matches(&self, path: &Path) -> bool {
        self.filter.matches(path)
    }

    /// Tests every precondition against the content. An empty list holds.
    pub fn satisfies(&self, content: &[u8]) -> bool {
        self.preconditions.iter().all(|p| p.check(content))
    }

    /// Runs the procedures in order, each on the previous one's output.
    pub fn apply(&self, content: Vec<u8>) -> Vec<u8> {
        self.procedures.iter().fold(content, |current, rewrite| {
            trace!(transformation = self.index + 1, "{}", rewrite.describe());
            rewrite.apply(&current)
        })
    }

    /// Returns descriptions of the procedures.
    pub fn describe(&self) -> Vec<String> {
        self.procedures.iter().map(|p| p.describe()).collect()
    }
}

/// The executable form of a transformation set.
///
/// Transformations with configuration problems are left out and their
/// problems recorded, so a broken rule can never rewrite anything.
#[derive(Default)]
pub struct Plan {
    transformations: Vec<CompiledTransformation>,
    issues: Vec<ConfigIssue>,
}

impl Plan {
    /// Compiles a set against the built-in registries.
    pub fn compile(set: &TransformationSet) -> Self {
        Self::compile_with(
            set,
            &ProcedureRegistry::default(),
            &PreconditionRegistry::default(),
        )
    }

    /// Compiles a set against custom registries.
    pub fn compile_with(
        set: &TransformationSet,
        procedures: &ProcedureRegistry,
        preconditions: &PreconditionRegistry,
    ) -> Self {
        let mut plan = Plan::default();

        for (index, transformation) in set.transformations.iter().enumerate() {
            match CompiledTransformation::compile(index, transformation, procedures, preconditions)
            {
                Ok(compiled) => plan.transformations.push(compiled),
                Err(issues) => {
                    for issue in &issues {
                        error!("{issue}");
                    }
                    plan.issues.extend(issues);
                }
            }
        }

        plan
    }

    /// Fails with every recorded issue if any transformation was rejected.
    pub fn strict(self) -> Result<Self> {
        if self.issues.is_empty() {
            Ok(self)
        } else {
            Err(SeedError::Config(self.issues))
        }
    }

    /// Problems found while compiling.
    pub fn issues(&self) -> &[ConfigIssue] {
        &self.issues
    }

    /// Transformations that compiled, in declared order.
    pub fn transformations(&self) -> &[CompiledTransformation] {
        &self.transformations
    }

    pub fn is_empty(&self) -> bool {
        self.transformations.is_empty()
    }
}
