//! The resource-state invariant machine.
//!
//! Keeps `min <= lower <= upper <= current <= max` with a fixed `boundary`
//! gap between both `(current, upper)` and `(upper, lower)`. Every
//! container resource is validated on each tick and, if a repairable
//! violation is found, repaired by recomputing `upper`/`lower` from the
//! current `boundary` and retrying the validation, up to a bounded number
//! of attempts — the same validate/retry shape the teacher's circuit
//! breaker uses to drive its window-based state transitions, applied here
//! to a numeric invariant instead of a failure-rate threshold.

use guardian_core::{GuardianError, GuardianResult, Resource, ResourceLimits, ResourceState};

/// Maximum number of validate/repair cycles attempted per resource before
/// giving up with [`GuardianError::ResourceStateUnfixable`].
const MAX_REPAIR_ATTEMPTS: u32 = 10;

/// Outcome of running the repairer over one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepairOutcome {
    /// True if at least one repair pass mutated `limits`.
    pub repaired: bool,
    /// How many validate/repair cycles were needed (0 if the first
    /// validation already passed).
    pub attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Validation {
    Valid,
    Repairable,
}

fn validate(resource: Resource, state: &ResourceState, limits: &ResourceLimits) -> GuardianResult<Validation> {
    let current = match state.current {
        Some(c) => c,
        // No `current`: nothing to validate against (applications, or a
        // container not yet actuated). Callers are expected to have
        // already skipped this case for applications per §4.4 point 5;
        // for a container missing `current` there is simply no invariant
        // to check yet.
        None => return Ok(Validation::Valid),
    };

    if current > state.max {
        return Err(GuardianError::LimitAboveMax {
            resource: resource.to_string(),
            current,
            max: state.max,
        });
    }

    if limits.upper < current && limits.lower < limits.upper {
        Ok(Validation::Valid)
    } else {
        Ok(Validation::Repairable)
    }
}

/// Recomputes `upper`/`lower` from `current` and the fixed `boundary`.
/// `lower` may end up below `min`; this is an intentional deviation
/// carried over from observed source behavior (see DESIGN.md).
fn repair_once(current: i64, limits: &mut ResourceLimits) {
    limits.upper = current - limits.boundary;
    limits.lower = limits.upper - limits.boundary;
}

/// Validates and, if necessary, repairs one resource's limits in place.
///
/// §4.4 point 1's "fail fatally if `max`/`min`/`upper`/`lower`/`boundary`
/// is missing" is enforced earlier than this function: `ResourceState` and
/// `ResourceLimits` carry those fields as required (non-`Option`) `i64`s,
/// so a document missing one of them already fails to deserialize at the
/// `DocStore` boundary, surfacing as a transport error before a `Resource`/
/// `ResourceState` pair is ever constructed. A legitimately all-zero
/// reading (idle resource, freshly provisioned structure) is valid input
/// here and must not be rejected.
///
/// Returns `Ok` with whether a repair was performed, or a
/// [`GuardianError`] if the state is fatally invalid (fails fast,
/// `LimitAboveMax`) or could not be repaired within
/// [`MAX_REPAIR_ATTEMPTS`] attempts (`ResourceStateUnfixable`).
pub fn repair_resource(
    resource: Resource,
    state: &ResourceState,
    limits: &mut ResourceLimits,
) -> GuardianResult<RepairOutcome> {
    let mut repaired = false;
    for attempt in 0..MAX_REPAIR_ATTEMPTS {
        match validate(resource, state, limits)? {
            Validation::Valid => {
                return Ok(RepairOutcome {
                    repaired,
                    attempts: attempt,
                });
            }
            Validation::Repairable => {
                let current = state
                    .current
                    .expect("repairable validation implies current is present");
                repair_once(current, limits);
                repaired = true;

                #[cfg(feature = "tracing")]
                tracing::debug!(
                    resource = %resource,
                    attempt,
                    new_upper = limits.upper,
                    new_lower = limits.lower,
                    "repaired resource state invariant"
                );
            }
        }
    }

    match validate(resource, state, limits)? {
        Validation::Valid => Ok(RepairOutcome {
            repaired,
            attempts: MAX_REPAIR_ATTEMPTS,
        }),
        Validation::Repairable => {
            #[cfg(feature = "metrics")]
            metrics::counter!("guardian_state_unfixable_total", "resource" => resource.to_string())
                .increment(1);

            Err(GuardianError::ResourceStateUnfixable {
                resource: resource.to_string(),
            })
        }
    }
}

/// Runs [`repair_resource`] over every label in `resources`, skipping any
/// resource not present in `limits` (the repairer only touches resources
/// that have a companion limits entry).
///
/// Per §4.4 point 5, callers must not invoke this for application
/// structures — they carry no `current` and their limits are assumed
/// externally maintained.
pub fn run(
    resources: &std::collections::HashMap<Resource, ResourceState>,
    limits: &mut std::collections::HashMap<Resource, ResourceLimits>,
    labels: &[Resource],
) -> GuardianResult<Vec<(Resource, RepairOutcome)>> {
    let mut outcomes = Vec::with_capacity(labels.len());
    for &label in labels {
        let Some(state) = resources.get(&label) else {
            continue;
        };
        let Some(resource_limits) = limits.get_mut(&label) else {
            continue;
        };
        let outcome = repair_resource(label, state, resource_limits)?;
        outcomes.push((label, outcome));
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(current: i64, max: i64, min: i64) -> ResourceState {
        ResourceState {
            min,
            max,
            current: Some(current),
            usage: None,
            guard: true,
        }
    }

    #[test]
    fn s4_repair_scenario() {
        // Structure cpu {min:50, max:200, current:140}, limits
        // {lower:200, upper:200, boundary:20} (upper >= current, invalid).
        let s = state(140, 200, 50);
        let mut limits = ResourceLimits {
            lower: 200,
            upper: 200,
            boundary: 20,
        };

        let outcome = repair_resource(Resource::Cpu, &s, &mut limits).unwrap();
        assert!(outcome.repaired);
        assert_eq!(limits.upper, 120);
        assert_eq!(limits.lower, 100);
    }

    #[test]
    fn property_1_state_invariant_holds_after_success() {
        let s = state(140, 200, 50);
        let mut limits = ResourceLimits {
            lower: 10,
            upper: 130,
            boundary: 20,
        };

        repair_resource(Resource::Cpu, &s, &mut limits).unwrap();
        assert_eq!(limits.upper, s.current.unwrap() - limits.boundary);
        assert_eq!(limits.lower, limits.upper - limits.boundary);
        assert!(s.current.unwrap() <= s.max);
    }

    #[test]
    fn already_valid_state_is_left_untouched() {
        let s = state(140, 200, 50);
        let mut limits = ResourceLimits {
            lower: 100,
            upper: 120,
            boundary: 20,
        };
        let before = limits;

        let outcome = repair_resource(Resource::Cpu, &s, &mut limits).unwrap();
        assert!(!outcome.repaired);
        assert_eq!(limits, before);
    }

    #[test]
    fn current_above_max_is_fatal_not_repairable() {
        let s = state(250, 200, 50);
        let mut limits = ResourceLimits {
            lower: 100,
            upper: 120,
            boundary: 20,
        };

        let err = repair_resource(Resource::Cpu, &s, &mut limits).unwrap_err();
        assert!(matches!(err, GuardianError::LimitAboveMax { .. }));
    }

    #[test]
    fn lower_below_min_is_tolerated_per_open_question() {
        // current - boundary*2 dips lower below min; the repairer must not
        // reject this, only StateInvariantRepairer's caller may act on it.
        let s = state(45, 200, 50);
        let mut limits = ResourceLimits {
            lower: 200,
            upper: 200,
            boundary: 20,
        };

        let outcome = repair_resource(Resource::Cpu, &s, &mut limits).unwrap();
        assert!(outcome.repaired);
        assert_eq!(limits.upper, 25);
        assert_eq!(limits.lower, 5);
        assert!(limits.lower < s.min);
    }

    #[test]
    fn missing_current_is_valid_no_op() {
        let s = ResourceState {
            min: 50,
            max: 200,
            current: None,
            usage: Some(10),
            guard: true,
        };
        let mut limits = ResourceLimits {
            lower: 100,
            upper: 120,
            boundary: 20,
        };
        let before = limits;
        let outcome = repair_resource(Resource::Cpu, &s, &mut limits).unwrap();
        assert!(!outcome.repaired);
        assert_eq!(limits, before);
    }

    #[test]
    fn run_skips_resources_absent_from_limits() {
        use std::collections::HashMap;

        let mut resources = HashMap::new();
        resources.insert(Resource::Cpu, state(140, 200, 50));
        resources.insert(Resource::Mem, state(100, 300, 20));

        let mut limits = HashMap::new();
        limits.insert(
            Resource::Cpu,
            ResourceLimits {
                lower: 100,
                upper: 120,
                boundary: 20,
            },
        );
        // Mem has no limits entry: must be skipped, not errored.

        let outcomes = run(&resources, &mut limits, &[Resource::Cpu, Resource::Mem]).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].0, Resource::Cpu);
    }
}
