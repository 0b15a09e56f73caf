//! Bounded retry and backoff primitives backing the DocStore facade's
//! optimistic-concurrency and missing-collection retry loops.

mod interval;

pub use interval::{AttemptBudget, FixedInterval};
