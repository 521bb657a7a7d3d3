//! # Seed
//!
//! Batch source transformation driven by a declarative description file.
//!
//! A description lists transformations. Each one selects files by base-name
//! globs, gates on content preconditions, and rewrites the content with an
//! ordered list of procedures. The engine walks a directory, runs every file
//! through every transformation on a bounded worker pool, and rewrites only
//! the files whose content actually changed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use seed::prelude::*;
//!
//! let set = TransformationSet::new(vec![
//!     Transformation::new("*.java|!*Test.java")
//!         .pre("Contains(org.seedstack.seed)")
//!         .procedure("Replace", ["org.seedstack.seed.core", "org.seedstack.seed"]),
//! ]);
//!
//! let summary = Fix::in_dir("./my-project")
//!     .jobs(8)
//!     .apply(&set, &mut std::io::stdout())?;
//!
//! println!("{} files rewritten", summary.changed_count());
//! # Ok::<(), seed::error::SeedError>(())
//! ```
//!
//! ## Description Files
//!
//! ```rust,no_run
//! use seed::prelude::*;
//!
//! let source = DescriptionSource::from_arg("tdf.yml");
//! let set = TransformationSet::load(&source)?;
//!
//! let mut fix = Fix::in_dir(".").dry_run();
//! if let Some(path) = source.local_path() {
//!     fix = fix.description(path);
//! }
//! let summary = fix.apply(&set, &mut std::io::stdout())?;
//! for change in &summary.previews {
//!     println!("{}", unified_diff(change));
//! }
//! # Ok::<(), seed::error::SeedError>(())
//! ```

pub mod config;
pub mod diff;
pub mod driver;
pub mod error;
pub mod fix;
pub mod logging;
pub mod matcher;
pub mod processor;
pub mod transform;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::{
        DescriptionSource, Format, Procedure, RunConfig, Transformation, TransformationSet,
    };
    pub use crate::diff::{colorized_diff, unified_diff, DiffSummary};
    pub use crate::driver::{Driver, RunSummary};
    pub use crate::error::{ConfigIssue, Result, SeedError};
    pub use crate::fix::Fix;
    pub use crate::matcher::{walk, Filter, PatternSet, WalkResult, Walker};
    pub use crate::processor::{process, FileChange};
    pub use crate::transform::{
        CompiledTransformation, Plan, Predicate, PreconditionRegistry, ProcedureRegistry,
        Rewrite, TextProcedure,
    };
}

pub use prelude::*;
