//! The Guardian's periodic per-structure fan-out driver (component C8).
//!
//! [`TickScheduler`] owns the `Idle -> LoadConfig -> Heartbeat ->
//! ListStructures -> FanOut -> Join -> Sleep` state machine (§4.8);
//! [`run_structure_tick`] is the per-structure pipeline it fans each
//! guarded structure out to, in the exact step order §5 requires.

mod executor;
mod pipeline;
mod tick;

pub use executor::Executor;
pub use pipeline::run_structure_tick;
pub use tick::{TickOutcome, TickScheduler, SERVICE_NAME};
