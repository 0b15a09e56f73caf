//! The Guardian's unified error type.
//!
//! [`GuardianError`] plays the same role `ResilienceError<E>` plays for the
//! teacher's layered middleware: every component (`guardian-docstore`,
//! `guardian-state`, `guardian-rules`, ...) defines its own leaf error type
//! and converts it into `GuardianError` via `From`, so call sites at the
//! scheduler boundary can match on one taxonomy instead of threading each
//! crate's error type through.
//!
//! Per the error handling design, nothing here is retried indefinitely and
//! none of these variants abort the tick loop; the scheduler catches and
//! logs them at the per-structure task boundary.

use std::fmt;

/// Errors produced anywhere in the Guardian pipeline.
///
/// # Policy
///
/// - `Transport` / `ConflictExhausted` / `NotFound`: surfaced by the store
///   facade after its own retry budget is exhausted; the structure is
///   skipped this tick.
/// - `ResourceStateInvalid` / `LimitAboveMax` / `ResourceStateUnfixable`:
///   fatal for the structure this tick, never for the loop.
/// - `RuleMalformed`: the offending rule is skipped; evaluation continues
///   for every other rule.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GuardianError {
    /// A DocStore or MetricsClient HTTP call failed after retries.
    #[error("transport error: {0}")]
    Transport(String),

    /// An optimistic-concurrency update conflicted on every one of its
    /// retries (5 by contract).
    #[error("update conflicted on every retry")]
    ConflictExhausted,

    /// A strict getter (`get_rule`, `get_service`, ...) found nothing.
    #[error("not found: {0}")]
    NotFound(String),

    /// A required limit field (`max`, `min`, `upper`, `lower`, `boundary`)
    /// was missing.
    #[error("resource state invalid for {resource}: {reason}")]
    ResourceStateInvalid { resource: String, reason: String },

    /// `current` exceeded `max`; not a repairable condition.
    #[error("{resource}: current ({current}) above max ({max})")]
    LimitAboveMax {
        resource: String,
        current: i64,
        max: i64,
    },

    /// The repair loop ran its full attempt budget (10) without reaching a
    /// valid state.
    #[error("resource state for {resource} could not be repaired")]
    ResourceStateUnfixable { resource: String },

    /// A rule is missing a field its `generates`/`rescale_by` combination
    /// requires, or its event-name selection is ambiguous (both scale
    /// counters nonzero).
    #[error("rule '{rule_name}' is malformed: missing {missing_field}")]
    RuleMalformed {
        rule_name: String,
        missing_field: String,
    },
}

impl GuardianError {
    pub fn is_transport(&self) -> bool {
        matches!(self, GuardianError::Transport(_))
    }

    pub fn is_conflict_exhausted(&self) -> bool {
        matches!(self, GuardianError::ConflictExhausted)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GuardianError::NotFound(_))
    }

    pub fn is_rule_malformed(&self) -> bool {
        matches!(self, GuardianError::RuleMalformed { .. })
    }

    /// True for the errors that invalidate the whole structure's tick
    /// (as opposed to one rule).
    pub fn is_structure_fatal(&self) -> bool {
        matches!(
            self,
            GuardianError::ResourceStateInvalid { .. }
                | GuardianError::LimitAboveMax { .. }
                | GuardianError::ResourceStateUnfixable { .. }
        )
    }
}

/// A lightweight `Result` alias used throughout the Guardian crates.
pub type GuardianResult<T> = Result<T, GuardianError>;

/// Implemented by each crate's leaf error so it can be folded into
/// [`GuardianError`] without a manual `impl From` at every call site.
///
/// Mirrors the teacher's pattern of each resilience layer providing its own
/// `From<LayerError> for ResilienceError<E>`, except here the conversion
/// target is concrete rather than generic over an application error.
pub trait IntoGuardianError: fmt::Display {
    fn into_guardian_error(self) -> GuardianError;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structure_fatal_covers_the_three_repair_variants() {
        assert!(GuardianError::LimitAboveMax {
            resource: "cpu".into(),
            current: 300,
            max: 200,
        }
        .is_structure_fatal());
        assert!(GuardianError::ResourceStateUnfixable {
            resource: "cpu".into()
        }
        .is_structure_fatal());
        assert!(!GuardianError::ConflictExhausted.is_structure_fatal());
    }

    #[test]
    fn rule_malformed_carries_name_and_field() {
        let err = GuardianError::RuleMalformed {
            rule_name: "cpu_exceeded_upper".into(),
            missing_field: "rescale_by".into(),
        };
        assert!(err.is_rule_malformed());
        assert!(err.to_string().contains("cpu_exceeded_upper"));
    }
}
