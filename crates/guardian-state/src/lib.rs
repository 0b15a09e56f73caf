//! The Guardian's resource-state invariant machine (component C4).
//!
//! Enforces `min <= lower <= upper <= current <= max` with
//! `current - boundary = upper` and `upper - boundary = lower` for every
//! guarded container resource, repairing by recomputing `upper`/`lower`
//! from `current` when a repairable violation is found. Applications are
//! never passed through here — see §4.4 point 5.

mod repair;

pub use repair::{repair_resource, run, RepairOutcome};
