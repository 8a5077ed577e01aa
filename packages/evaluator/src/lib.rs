//! Kiln evaluator.
//!
//! Reduces a Kiln syntax tree to plain stylesheet constructs: variables and
//! modules are resolved, arithmetic and `calc()` algebra are folded, nested
//! selectors are merged with their parents, and `@if`/`@each`/`@include`
//! are unrolled in place.

pub mod args;
pub mod arithmetic;
pub mod builtins;
pub mod classes;
pub mod color;
pub mod error;
pub mod expression;
pub mod host;
pub mod math;
pub mod members;
pub mod options;
pub mod reducer;
pub mod registry;
pub mod scope;
pub mod selectors;
pub mod units;
pub mod values;

#[cfg(test)]
mod tests_reducer;

#[cfg(test)]
mod tests_control_flow;

#[cfg(test)]
mod tests_modules;

#[cfg(test)]
mod tests_diagnostics;

pub use arithmetic::Calculator;
pub use error::{CompileError, ErrorKind, ReduceError, ReduceResult};
pub use expression::ExprEvaluator;
pub use host::{expr_from_json, expr_to_json, ToExpr};
pub use members::ModuleMembers;
pub use options::{ClassScope, ReduceOptions};
pub use reducer::{ReducedFile, Reducer, MAX_MIXIN_DEPTH};
pub use registry::{ModuleRegistry, StaticRegistry};
pub use scope::{Member, Scope};
