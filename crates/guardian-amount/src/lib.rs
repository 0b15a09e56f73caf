//! The Guardian's rescale-amount policy (component C5).
//!
//! Three policies turn a fired request-rule into a signed integer amount:
//! `amount` (the rule's literal value), `fit_to_usage` (place usage
//! between the new `lower`/`upper`), and `proportional` (drive CPU shares
//! from headroom to the energy cap). The raw amount is then clamped so no
//! request can push a structure outside `[min, max]`, except for
//! `NON_ADJUSTABLE` resources (currently just `energy`).

mod policy;

pub use policy::{
    clamp, compute, raw_amount, remap_energy_to_cpu, truncate_with_sign_snap, ClampInputs,
    PolicyInputs,
};
