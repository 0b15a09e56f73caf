//! The Guardian's RequestEngine (component C7).
//!
//! Turns reduced per-resource event counters into rescale requests: for
//! every active request-generating rule whose resource has a reduced
//! entry, evaluates the rule against that entry, computes a clamped
//! amount via [`guardian_amount`], and emits a [`Request`]. Tracks how
//! many events of the triggering name should be consumed per resource,
//! regardless of whether the computed amount ended up zero (§4.7 step 6;
//! scenario S2).

use std::collections::HashMap;

use guardian_amount::{compute, ClampInputs, PolicyInputs};
use guardian_core::{Generates, Limits, Request, Resource, ResourceState, Rule, ScaleCounters, Structure, StructureSubtype};
use guardian_events::{pick_scale_direction, ReducedCounters};
use guardian_rules::{evaluate, RuleEvalError};
use serde_json::Value;

/// A rule whose request was skipped, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRule {
    pub rule_name: String,
    pub reason: String,
}

/// Everything [`generate_requests`] needs for one structure's tick.
pub struct RequestParams<'a> {
    pub structure: &'a Structure,
    pub rules: &'a [Rule],
    pub reduced: &'a HashMap<Resource, ReducedCounters>,
    pub limits: &'a Limits,
    /// Derived-metric usage map, same shape as [`guardian_events::GenerateParams::usages`].
    pub usages: &'a HashMap<String, f64>,
    pub cpu_shares_per_watt: i64,
    pub now: i64,
}

/// Result of one call to [`generate_requests`].
#[derive(Debug, Clone, Default)]
pub struct RequestOutcome {
    pub requests: Vec<Request>,
    /// Event name -> how many of that name to consume for this structure,
    /// via `DocStore::delete_num_events_by_structure`.
    pub events_to_remove: HashMap<String, u32>,
    pub skipped_rules: Vec<SkippedRule>,
    /// Rules that fired with an unset/unknown `rescale_by`, falling back
    /// to the `amount` policy (§4.5).
    pub rescale_by_fallback_warnings: Vec<String>,
}

fn usage_for(resource: Resource, usages: &HashMap<String, f64>, resources: &HashMap<Resource, ResourceState>) -> f64 {
    let key = match resource {
        Resource::Cpu => "structure.cpu.usage",
        Resource::Mem => "structure.mem.usage",
        Resource::Energy => "structure.energy.usage",
        Resource::Disk => "structure.disk.usage",
        Resource::Net => "structure.net.usage",
    };
    usages
        .get(key)
        .copied()
        .filter(|v| !v.is_nan())
        .or_else(|| resources.get(&resource).and_then(|r| r.usage).map(|u| u as f64))
        .unwrap_or(0.0)
}

/// Runs request-rule evaluation for one structure's tick.
pub fn generate_requests(params: &RequestParams<'_>) -> RequestOutcome {
    let mut outcome = RequestOutcome::default();
    let is_container = params.structure.subtype == StructureSubtype::Container;

    for rule in params.rules {
        if !rule.active || rule.generates != Generates::Requests {
            continue;
        }

        let Some(counters) = params.reduced.get(&rule.resource) else {
            continue;
        };

        if is_container
            && params
                .structure
                .resources
                .get(&rule.resource)
                .and_then(|r| r.current)
                .is_none()
        {
            outcome.skipped_rules.push(SkippedRule {
                rule_name: rule.name.clone(),
                reason: format!(
                    "no current value for container '{}' resource '{}', can't rescale",
                    params.structure.name, rule.resource
                ),
            });
            continue;
        }

        let ctx = reduced_context(*counters);
        match evaluate(&rule.rule, &ctx) {
            Ok(result) if is_truthy(&result) => {}
            Ok(_) => continue,
            Err(RuleEvalError::MissingField(field)) => {
                outcome.skipped_rules.push(SkippedRule {
                    rule_name: rule.name.clone(),
                    reason: format!("missing field '{field}'"),
                });
                continue;
            }
            Err(RuleEvalError::Malformed(reason)) => {
                outcome.skipped_rules.push(SkippedRule {
                    rule_name: rule.name.clone(),
                    reason,
                });
                continue;
            }
        }

        let resource_state = params.structure.resources.get(&rule.resource);
        let current = resource_state.and_then(|r| r.current).unwrap_or(0);
        let resource_limits = params.limits.resources.get(&rule.resource).copied().unwrap_or_default();
        let energy_state = params.structure.resources.get(&Resource::Energy);

        let policy_inputs = PolicyInputs {
            rule_amount: rule.amount,
            rescale_by: rule.rescale_by,
            resource: rule.resource,
            usage: usage_for(rule.resource, params.usages, &params.structure.resources),
            current,
            boundary: resource_limits.boundary,
            energy_max: energy_state.map(|r| r.max).unwrap_or(0),
            energy_usage: usage_for(Resource::Energy, params.usages, &params.structure.resources),
            cpu_shares_per_watt: params.cpu_shares_per_watt,
        };
        let clamp_inputs = ClampInputs {
            min: resource_state.map(|r| r.min).unwrap_or(0),
            max: resource_state.map(|r| r.max).unwrap_or(0),
            lower: resource_limits.lower,
        };

        let (amount, used_default) = compute(&policy_inputs, clamp_inputs);
        if used_default {
            outcome
                .rescale_by_fallback_warnings
                .push(format!("rule '{}' has no rescale_by policy, defaulting to amount", rule.name));
        }

        if amount != 0 {
            let (resource, for_energy) = guardian_amount::remap_energy_to_cpu(rule.resource);
            let mut request = Request {
                resource,
                amount,
                structure: params.structure.name.clone(),
                structure_type: params.structure.subtype,
                action: action_for_amount(amount),
                timestamp: params.now,
                host: None,
                host_rescaler_ip: None,
                host_rescaler_port: None,
                for_energy,
            };
            if is_container {
                if let Some(host) = &params.structure.host {
                    request.host = Some(host.host.clone());
                    request.host_rescaler_ip = Some(host.host_rescaler_ip.clone());
                    request.host_rescaler_port = Some(host.host_rescaler_port);
                }
            }
            outcome.requests.push(request);
        }

        match pick_scale_direction(counters.up, counters.down) {
            Ok(direction) => {
                let event_name = format!("{}_{}", rule.resource, direction);
                *outcome.events_to_remove.entry(event_name).or_insert(0) += rule.events_to_remove;
            }
            Err(reason) => outcome.skipped_rules.push(SkippedRule {
                rule_name: rule.name.clone(),
                reason: format!("reduced counters {reason}"),
            }),
        }
    }

    outcome
}

fn reduced_context(counters: ReducedCounters) -> Value {
    serde_json::json!({
        "events": { "scale": { "up": counters.up, "down": counters.down } }
    })
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        _ => true,
    }
}

fn action_for_amount(amount: i64) -> ScaleCounters {
    if amount >= 0 {
        ScaleCounters { up: 1, down: 0 }
    } else {
        ScaleCounters { up: 0, down: 1 }
    }
}
