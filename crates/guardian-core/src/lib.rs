//! Shared types, errors, configuration and telemetry for the Guardian
//! control loop.
//!
//! Every other `guardian-*` crate depends on this one for the document
//! types that cross component boundaries (`Structure`, `Limits`, `Rule`,
//! `Event`, `Request`), the unified [`error::GuardianError`], the
//! [`config::Config`] threaded through call sites instead of globals, and
//! the [`events::GuardianEvent`] telemetry trait.

pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::{Config, ConfigBuilder, StructureGuarded};
pub use error::{GuardianError, GuardianResult, IntoGuardianError};
pub use events::{EventListener, EventListeners, FnListener, GuardianEvent, TickEvent};
pub use types::{
    is_no_data, Event, Generates, GuardPolicy, HostInfo, Limits, Request, RescaleBy, Resource,
    ResourceLimits, ResourceState, Rule, RuleAction, RuleActionEvents, ScaleCounters, Structure,
    StructureSubtype, NO_DATA,
};
