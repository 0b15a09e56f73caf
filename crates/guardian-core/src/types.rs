//! Shared document types exchanged between the Guardian components and the
//! store/metrics facades.
//!
//! These mirror the JSON-shaped documents described by the data model: a
//! closed `Resource` enum in place of free-form string keys, and explicit
//! optional fields in place of the `"n/a"` sentinel string used by the
//! original source.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A guarded resource kind. `cpu` is measured in shares, `mem` in MiB,
/// `energy` in watts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Cpu,
    Mem,
    Energy,
    Disk,
    Net,
}

impl Resource {
    /// Resources for which [`crate::config::Config::non_adjustable`] always
    /// returns true: amount clamping is skipped for these.
    pub fn is_non_adjustable(self) -> bool {
        matches!(self, Resource::Energy)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Cpu => "cpu",
            Resource::Mem => "mem",
            Resource::Energy => "energy",
            Resource::Disk => "disk",
            Resource::Net => "net",
        }
    }

    pub fn parse(label: &str) -> Option<Resource> {
        match label {
            "cpu" => Some(Resource::Cpu),
            "mem" => Some(Resource::Mem),
            "energy" => Some(Resource::Energy),
            "disk" => Some(Resource::Disk),
            "net" => Some(Resource::Net),
            _ => None,
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a structure is an individual container or an application
/// composed of containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructureSubtype {
    Container,
    Application,
}

/// How a structure is guarded. Only `Serverless` is an active policy; any
/// other value leaves the structure untouched by the fan-out step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardPolicy {
    Serverless,
    Fixed,
    #[serde(other)]
    Unknown,
}

/// A single resource's state within a structure's `resources` map.
///
/// `current` is absent for applications and for containers that have not
/// yet been actuated; `energy` carries its reading in `usage` rather than
/// `current` (see the amount policy's energy handling).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceState {
    pub min: i64,
    pub max: i64,
    #[serde(default)]
    pub current: Option<i64>,
    #[serde(default)]
    pub usage: Option<i64>,
    #[serde(default)]
    pub guard: bool,
}

/// Optional host routing metadata carried on container structures and
/// propagated onto requests.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HostInfo {
    pub host: String,
    pub host_rescaler_ip: String,
    pub host_rescaler_port: u16,
}

/// A guarded workload: a container or an application composed of
/// containers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Structure {
    pub name: String,
    pub subtype: StructureSubtype,
    pub guard: bool,
    pub guard_policy: GuardPolicy,
    #[serde(flatten, default)]
    pub host: Option<HostInfo>,
    pub resources: HashMap<Resource, ResourceState>,
}

/// Per-resource `{lower, upper, boundary}`, co-owned by the operator and
/// the repairer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub lower: i64,
    pub upper: i64,
    pub boundary: i64,
}

/// The `limits` companion document for a structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    pub name: String,
    pub resources: HashMap<Resource, ResourceLimits>,
}

/// What a rule produces when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Generates {
    Events,
    Requests,
}

/// How [`crate::types::Rule::amount`] or the reduced-events counters are
/// turned into a signed rescale amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RescaleBy {
    Amount,
    FitToUsage,
    Proportional,
}

/// The `events.scale.up|down` counters carried on a rule's `action` and
/// used to name the event/request it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScaleCounters {
    #[serde(default)]
    pub up: u32,
    #[serde(default)]
    pub down: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuleAction {
    #[serde(default)]
    pub events: RuleActionEvents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuleActionEvents {
    #[serde(default)]
    pub scale: ScaleCounters,
}

/// A declarative rule: a predicate over a JSON-shaped context, plus what to
/// do when it fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub active: bool,
    pub resource: Resource,
    pub rule: serde_json::Value,
    pub generates: Generates,
    pub action: RuleAction,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub rescale_by: Option<RescaleBy>,
    #[serde(default)]
    pub events_to_remove: u32,
}

/// A single observation that a limit was crossed. Events accumulate until
/// they age out or are consumed by a triggered request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub resource: Resource,
    pub structure: String,
    pub action: ScaleCounters,
    /// Epoch seconds.
    pub timestamp: i64,
}

/// An aggregated decision to change `current` by a signed amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub resource: Resource,
    pub amount: i64,
    pub structure: String,
    pub structure_type: StructureSubtype,
    pub action: ScaleCounters,
    pub timestamp: i64,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub host_rescaler_ip: Option<String>,
    #[serde(default)]
    pub host_rescaler_port: Option<u16>,
    #[serde(default)]
    pub for_energy: bool,
}

/// The sentinel a [`crate::config`]-driven metrics query returns for a
/// derived metric with no samples in its window.
pub const NO_DATA: f64 = f64::NAN;

/// True if a metrics sample should be treated as [`NO_DATA`]. `NaN` never
/// compares equal to itself, so this is the only correct way to test it.
pub fn is_no_data(v: f64) -> bool {
    v.is_nan()
}
