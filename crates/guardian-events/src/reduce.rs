use std::collections::HashMap;

use guardian_core::{Event, Resource};

/// Result of partitioning a structure's events by age.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgeOutcome {
    /// Events still inside the `[now - timeout, now]` window.
    pub valid: Vec<Event>,
    /// Events older than `timeout`; the caller deletes these from the
    /// store.
    pub stale: Vec<Event>,
}

/// Partitions `events` into valid and stale sets. `now` is captured once
/// by the caller and passed in, matching §4.6's "`now` is captured once
/// per call" — running this twice against the same `now` is idempotent
/// (testable property 4).
pub fn age(events: Vec<Event>, timeout_secs: i64, now: i64) -> AgeOutcome {
    let cutoff = now - timeout_secs;
    let mut outcome = AgeOutcome::default();
    for event in events {
        if event.timestamp < cutoff {
            outcome.stale.push(event);
        } else {
            outcome.valid.push(event);
        }
    }
    outcome
}

/// Per-resource scale-up/scale-down counters, the shape request-rules
/// evaluate against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReducedCounters {
    pub up: u32,
    pub down: u32,
}

/// Sums the per-direction counters across all events in `events`, grouped
/// by resource. `reduce(A ∪ B) = reduce(A) + reduce(B)` componentwise
/// (testable property 5); a resource with no events simply has no entry
/// (callers treat an absent resource as zero on both counters).
pub fn reduce(events: &[Event]) -> HashMap<Resource, ReducedCounters> {
    let mut out: HashMap<Resource, ReducedCounters> = HashMap::new();
    for event in events {
        let counters = out.entry(event.resource).or_default();
        counters.up += event.action.up;
        counters.down += event.action.down;
    }
    out
}
