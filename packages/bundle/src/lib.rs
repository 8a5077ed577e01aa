//! Multi-file reduction for Kiln stylesheets.
//!
//! Builds the import graph of a set of files, reduces them
//! dependencies-first and serves each file's exports to its importers.

pub mod bundle;
pub mod error;
pub mod graph;
pub mod resolver;
pub mod scheduler;

pub use bundle::Bundle;
pub use error::{BundleError, BundleResult};
pub use graph::ImportGraph;
pub use resolver::{module_specifiers, resolve_imports, FileRegistry};
pub use scheduler::ReductionScheduler;
