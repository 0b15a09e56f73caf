//! Computes the signed rescale amount for a fired request-rule and clamps
//! it to keep the structure inside its allowed range.

use guardian_core::{Resource, RescaleBy};

/// Everything [`compute`] needs to know about the firing rule and the
/// structure's current state to produce a raw (pre-clamp) amount.
#[derive(Debug, Clone, Copy)]
pub struct PolicyInputs {
    /// `rule.amount`, used by the `Amount` policy.
    pub rule_amount: Option<i64>,
    /// `rule.rescale_by`; `None` falls back to `Amount` with a warning.
    pub rescale_by: Option<RescaleBy>,
    /// The resource the firing rule targets.
    pub resource: Resource,
    /// The metrics-reported usage for `resource` (may be fractional; the
    /// integer `resources[resource].usage` cache is not precise enough for
    /// the fit-to-usage formula).
    pub usage: f64,
    /// `resources[resource].current`.
    pub current: i64,
    /// `limits[resource].boundary`.
    pub boundary: i64,
    /// `resources[energy].max`, needed by the `Proportional` policy.
    pub energy_max: i64,
    /// `resources[energy].usage`, needed by the `Proportional` policy.
    pub energy_usage: f64,
    /// `Config::cpu_shares_per_watt`.
    pub cpu_shares_per_watt: i64,
}

/// The structure's allowed range, used by [`clamp`]. Clamping is skipped
/// entirely for resources in `NON_ADJUSTABLE` (just `energy`).
#[derive(Debug, Clone, Copy)]
pub struct ClampInputs {
    pub min: i64,
    pub max: i64,
    pub lower: i64,
}

/// Computes `(usage + boundary/2 + boundary) - current` using integer
/// division on the floor of `boundary/2`, matching the source's `//`
/// semantics.
fn fit_to_usage(usage: f64, boundary: i64, current: i64) -> f64 {
    usage + (boundary / 2) as f64 + boundary as f64 - current as f64
}

/// `(energy.max - energy.usage) * cpu_shares_per_watt`, driving CPU shares
/// from headroom to the energy cap.
fn proportional(energy_max: i64, energy_usage: f64, cpu_shares_per_watt: i64) -> f64 {
    (energy_max as f64 - energy_usage) * cpu_shares_per_watt as f64
}

/// Truncates a raw amount to an integer, except that a nonzero amount
/// strictly between -1 and 1 snaps to the matching sign instead of
/// truncating to zero. Prevents a rule from re-triggering indefinitely on
/// fractional rounding (testable property 3).
pub fn truncate_with_sign_snap(raw: f64) -> i64 {
    let truncated = raw.trunc() as i64;
    if truncated == 0 && raw != 0.0 {
        if raw > 0.0 {
            1
        } else {
            -1
        }
    } else {
        truncated
    }
}

/// Computes the raw, pre-clamp amount for the given policy. An unknown or
/// absent `rescale_by` falls back to the `Amount` policy (and the caller
/// should warn — this function does not log, it only reports the fallback
/// via the returned `bool`).
pub fn raw_amount(inputs: &PolicyInputs) -> (i64, bool) {
    let (raw, used_default) = match inputs.rescale_by {
        Some(RescaleBy::Amount) | None => (
            inputs.rule_amount.unwrap_or(0) as f64,
            inputs.rescale_by.is_none(),
        ),
        Some(RescaleBy::FitToUsage) => (
            fit_to_usage(inputs.usage, inputs.boundary, inputs.current),
            false,
        ),
        Some(RescaleBy::Proportional) => (
            proportional(inputs.energy_max, inputs.energy_usage, inputs.cpu_shares_per_watt),
            false,
        ),
    };
    (truncate_with_sign_snap(raw), used_default)
}

/// Clamps `amount` so that the post-application `current` stays within
/// `[min, max]` and `lower + amount >= min`. Mirrors the source's
/// single if/else-if adjustment: at most one of the two bounds is
/// corrected per call (a rule authored to violate both at once is out of
/// scope — §9 notes this is observed-source behavior, not a hard
/// guarantee for pathological inputs).
pub fn clamp(amount: i64, current: i64, clamp_inputs: ClampInputs) -> i64 {
    let expected = current + amount;
    let new_lower = clamp_inputs.lower + amount;

    if new_lower < clamp_inputs.min {
        amount + (clamp_inputs.min - new_lower)
    } else if expected > clamp_inputs.max {
        amount - (expected - clamp_inputs.max)
    } else {
        amount
    }
}

/// Computes the full signed amount: raw policy amount, then clamped
/// unless `resource` is in `NON_ADJUSTABLE` (currently only `energy`).
/// Returns the amount plus whether the caller should emit an
/// "unknown rescale_by, defaulting to amount" warning.
pub fn compute(inputs: &PolicyInputs, clamp_inputs: ClampInputs) -> (i64, bool) {
    let (raw, used_default) = raw_amount(inputs);
    let amount = if inputs.resource.is_non_adjustable() {
        raw
    } else {
        clamp(raw, inputs.current, clamp_inputs)
    };
    (amount, used_default)
}

/// If `resource` is `energy`, the rule's fallout request is rewritten to
/// target `cpu` with `for_energy = true` (see §4.5 "Energy special").
/// Returns the resource the emitted request should carry.
pub fn remap_energy_to_cpu(resource: Resource) -> (Resource, bool) {
    if resource == Resource::Energy {
        (Resource::Cpu, true)
    } else {
        (resource, false)
    }
}
