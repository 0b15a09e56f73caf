//! The Guardian's rule predicate evaluator (component C3).
//!
//! Rule documents carry a small JSON-logic-compatible predicate tree
//! (`{"and": [...]}`, `{"<": [{"var": "structure.cpu.usage"}, 10]}`, ...)
//! evaluated against a nested JSON context built from limits/usage/reduced
//! events. This crate is the one place that touches the rule DSL; every
//! other Guardian crate treats a rule's `rule` field as an opaque
//! `serde_json::Value` and calls [`evaluate`] on it.
//!
//! Pure and side-effect-free, as required by §4.3: no I/O, no interior
//! mutability, deterministic output for a given tree and context.

mod error;
mod eval;

pub use error::RuleEvalError;
pub use eval::evaluate;
