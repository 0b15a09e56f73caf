//! The Guardian's EventEngine (component C6).
//!
//! Three operations over a structure's usage/limits/rules:
//!
//! - [`generate`]: usage + limits + rules -> new events.
//! - [`age`]: partitions a structure's stored events into valid and stale
//!   (past `EVENT_TIMEOUT`).
//! - [`reduce`]: folds a set of valid events into per-resource up/down
//!   counters, the shape request-rules are evaluated against.

mod generate;
mod reduce;

pub use generate::{generate, pick_scale_direction, GenerateOutcome, GenerateParams, SkippedRule};
pub use reduce::{age, reduce, AgeOutcome, ReducedCounters};
