use std::collections::HashMap;

use guardian_core::{Event, Generates, Limits, Resource, ResourceState, Rule, ScaleCounters};
use guardian_rules::{evaluate, RuleEvalError};
use serde_json::Value;

/// A rule whose event generation was skipped because a required field was
/// missing or its event-name selection was ambiguous (§9, both scale
/// counters nonzero).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRule {
    pub rule_name: String,
    pub reason: String,
}

/// Everything [`generate`] needs for one structure's tick.
pub struct GenerateParams<'a> {
    pub structure_name: &'a str,
    pub rules: &'a [Rule],
    /// Derived-metric name (e.g. `"structure.cpu.usage"`) -> value. A
    /// sentinel (`NO_DATA`) entry is dropped before context-building, same
    /// as an absent entry.
    pub usages: &'a HashMap<String, f64>,
    pub limits: &'a Limits,
    pub resources: &'a HashMap<Resource, ResourceState>,
    pub guardable_resources: &'a [Resource],
    pub now: i64,
}

/// Result of one call to [`generate`].
#[derive(Debug, Clone, Default)]
pub struct GenerateOutcome {
    pub events: Vec<Event>,
    pub skipped_rules: Vec<SkippedRule>,
    /// Guardable resources with zero event-generating rules targeting
    /// them this tick (supplemented "no rules applied" warning, §2 of
    /// SPEC_FULL.md).
    pub resources_without_rules: Vec<Resource>,
}

/// Builds the per-resource evaluation context described by §4.6:
/// `ctx[resource] = {limits: {resource: limits[resource]}, structure: {resource: resources[resource] + usage}}`.
fn build_context(resource: Resource, limits: &Limits, resources: &HashMap<Resource, ResourceState>, usages: &HashMap<String, f64>) -> Option<Value> {
    let resource_limits = limits.resources.get(&resource)?;
    let resource_state = resources.get(&resource)?;

    let mut structure_resource = serde_json::to_value(resource_state).ok()?;
    if let Some(obj) = structure_resource.as_object_mut() {
        if let Some(usage) = usage_for(resource, usages) {
            obj.insert("usage".to_string(), serde_json::json!(usage));
        }
    }

    Some(serde_json::json!({
        "limits": { resource.as_str(): resource_limits },
        "structure": { resource.as_str(): structure_resource },
    }))
}

/// Maps a resource to its derived-metric name and looks up a non-sentinel
/// usage value for it.
fn usage_for(resource: Resource, usages: &HashMap<String, f64>) -> Option<f64> {
    let key = match resource {
        Resource::Cpu => "structure.cpu.usage",
        Resource::Mem => "structure.mem.usage",
        Resource::Energy => "structure.energy.usage",
        Resource::Disk => "structure.disk.usage",
        Resource::Net => "structure.net.usage",
    };
    usages.get(key).copied().filter(|v| !v.is_nan())
}

/// Picks the scale direction from whichever of a `{up, down}` counter
/// pair is nonzero. Both nonzero is a rule-authoring error (§9 open
/// question): treated as `RuleMalformed` rather than an arbitrary
/// tie-break.
///
/// Shared between event generation (`action.events.scale`) and the
/// RequestEngine's event-name selection over reduced counters, since both
/// carry the same `{up, down}` shape.
pub fn pick_scale_direction(up: u32, down: u32) -> Result<&'static str, &'static str> {
    match (up > 0, down > 0) {
        (true, false) => Ok("up"),
        (false, true) => Ok("down"),
        (false, false) => Err("neither up nor down is set"),
        (true, true) => Err("both up and down are set"),
    }
}

fn event_name(rule_name: &str, scale: ScaleCounters) -> Result<&'static str, SkippedRule> {
    pick_scale_direction(scale.up, scale.down).map_err(|reason| SkippedRule {
        rule_name: rule_name.to_string(),
        reason: format!("action.events.scale {reason}"),
    })
}

/// Runs event generation for one structure's tick.
pub fn generate(params: &GenerateParams<'_>) -> GenerateOutcome {
    let mut outcome = GenerateOutcome::default();

    let resources_with_rules: std::collections::HashSet<Resource> =
        params.rules.iter().map(|r| r.resource).collect();

    for &resource in params.guardable_resources {
        if !resources_with_rules.contains(&resource) {
            outcome.resources_without_rules.push(resource);
        }
    }

    let mut contexts: HashMap<Resource, Value> = HashMap::new();
    for &resource in params.guardable_resources {
        if let Some(ctx) = build_context(resource, params.limits, params.resources, params.usages) {
            contexts.insert(resource, ctx);
        }
    }

    for rule in params.rules {
        if !rule.active || rule.generates != Generates::Events {
            continue;
        }

        let Some(resource_state) = params.resources.get(&rule.resource) else {
            outcome.skipped_rules.push(SkippedRule {
                rule_name: rule.name.clone(),
                reason: format!("resource '{}' not present on structure", rule.resource),
            });
            continue;
        };
        if !resource_state.guard {
            continue;
        }

        let Some(ctx) = contexts.get(&rule.resource) else {
            outcome.skipped_rules.push(SkippedRule {
                rule_name: rule.name.clone(),
                reason: format!("no evaluation context for resource '{}'", rule.resource),
            });
            continue;
        };

        match evaluate(&rule.rule, ctx) {
            Ok(result) if is_truthy(&result) => {
                match event_name(&rule.name, rule.action.events.scale) {
                    Ok(direction) => {
                        let scale = rule.action.events.scale;
                        outcome.events.push(Event {
                            name: format!("{}_{}", rule.resource, direction),
                            resource: rule.resource,
                            structure: params.structure_name.to_string(),
                            action: scale,
                            timestamp: params.now,
                        });
                    }
                    Err(skipped) => outcome.skipped_rules.push(skipped),
                }
            }
            Ok(_) => {}
            Err(RuleEvalError::MissingField(field)) => outcome.skipped_rules.push(SkippedRule {
                rule_name: rule.name.clone(),
                reason: format!("missing field '{field}'"),
            }),
            Err(RuleEvalError::Malformed(reason)) => {
                outcome.skipped_rules.push(SkippedRule {
                    rule_name: rule.name.clone(),
                    reason,
                })
            }
        }
    }

    outcome
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guardian_core::{ResourceLimits, RuleAction, RuleActionEvents};

    fn cpu_exceeded_upper_rule() -> Rule {
        Rule {
            name: "cpu_exceeded_upper".to_string(),
            active: true,
            resource: Resource::Cpu,
            rule: serde_json::json!({
                ">=": [{"var": "structure.cpu.usage"}, {"var": "limits.cpu.upper"}]
            }),
            generates: Generates::Events,
            action: RuleAction {
                events: RuleActionEvents {
                    scale: ScaleCounters { up: 1, down: 0 },
                },
            },
            amount: None,
            rescale_by: None,
            events_to_remove: 1,
        }
    }

    fn node0_resources() -> HashMap<Resource, ResourceState> {
        let mut resources = HashMap::new();
        resources.insert(
            Resource::Cpu,
            ResourceState {
                min: 50,
                max: 200,
                current: Some(140),
                usage: None,
                guard: true,
            },
        );
        resources
    }

    fn node0_limits() -> Limits {
        let mut resources = HashMap::new();
        resources.insert(
            Resource::Cpu,
            ResourceLimits {
                lower: 80,
                upper: 120,
                boundary: 20,
            },
        );
        Limits {
            name: "node0".to_string(),
            resources,
        }
    }

    #[test]
    fn s1_cpu_exceeded_upper_fires_and_emits_one_event() {
        let rules = vec![cpu_exceeded_upper_rule()];
        let mut usages = HashMap::new();
        usages.insert("structure.cpu.usage".to_string(), 180.0);
        let resources = node0_resources();
        let limits = node0_limits();

        let params = GenerateParams {
            structure_name: "node0",
            rules: &rules,
            usages: &usages,
            limits: &limits,
            resources: &resources,
            guardable_resources: &[Resource::Cpu],
            now: 1_000,
        };

        let outcome = generate(&params);
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.events[0].name, "cpu_up");
        assert_eq!(outcome.events[0].structure, "node0");
        assert!(outcome.skipped_rules.is_empty());
        assert!(outcome.resources_without_rules.is_empty());
    }

    #[test]
    fn rule_does_not_fire_below_threshold() {
        let rules = vec![cpu_exceeded_upper_rule()];
        let mut usages = HashMap::new();
        usages.insert("structure.cpu.usage".to_string(), 90.0);
        let resources = node0_resources();
        let limits = node0_limits();

        let params = GenerateParams {
            structure_name: "node0",
            rules: &rules,
            usages: &usages,
            limits: &limits,
            resources: &resources,
            guardable_resources: &[Resource::Cpu],
            now: 1_000,
        };

        let outcome = generate(&params);
        assert!(outcome.events.is_empty());
    }

    #[test]
    fn unguarded_resource_never_fires() {
        let rules = vec![cpu_exceeded_upper_rule()];
        let mut usages = HashMap::new();
        usages.insert("structure.cpu.usage".to_string(), 180.0);
        let mut resources = node0_resources();
        resources.get_mut(&Resource::Cpu).unwrap().guard = false;
        let limits = node0_limits();

        let params = GenerateParams {
            structure_name: "node0",
            rules: &rules,
            usages: &usages,
            limits: &limits,
            resources: &resources,
            guardable_resources: &[Resource::Cpu],
            now: 1_000,
        };

        let outcome = generate(&params);
        assert!(outcome.events.is_empty());
        assert!(outcome.skipped_rules.is_empty());
    }

    #[test]
    fn ambiguous_scale_counters_are_skipped_as_malformed() {
        let mut rule = cpu_exceeded_upper_rule();
        rule.action.events.scale = ScaleCounters { up: 1, down: 1 };
        let rules = vec![rule];
        let mut usages = HashMap::new();
        usages.insert("structure.cpu.usage".to_string(), 180.0);
        let resources = node0_resources();
        let limits = node0_limits();

        let params = GenerateParams {
            structure_name: "node0",
            rules: &rules,
            usages: &usages,
            limits: &limits,
            resources: &resources,
            guardable_resources: &[Resource::Cpu],
            now: 1_000,
        };

        let outcome = generate(&params);
        assert!(outcome.events.is_empty());
        assert_eq!(outcome.skipped_rules.len(), 1);
        assert!(outcome.skipped_rules[0].reason.contains("both"));
    }

    #[test]
    fn resource_without_any_rule_is_reported() {
        let rules = vec![cpu_exceeded_upper_rule()];
        let usages = HashMap::new();
        let resources = node0_resources();
        let limits = node0_limits();

        let params = GenerateParams {
            structure_name: "node0",
            rules: &rules,
            usages: &usages,
            limits: &limits,
            resources: &resources,
            guardable_resources: &[Resource::Cpu, Resource::Mem],
            now: 1_000,
        };

        let outcome = generate(&params);
        assert_eq!(outcome.resources_without_rules, vec![Resource::Mem]);
    }

    #[test]
    fn property_7_unmonitored_structure_with_inactive_rule_emits_nothing() {
        // A rule targeting a resource the structure does not carry at all.
        let mut rule = cpu_exceeded_upper_rule();
        rule.resource = Resource::Mem;
        let rules = vec![rule];
        let usages = HashMap::new();
        let resources = node0_resources(); // no mem entry
        let limits = node0_limits();

        let params = GenerateParams {
            structure_name: "node0",
            rules: &rules,
            usages: &usages,
            limits: &limits,
            resources: &resources,
            guardable_resources: &[Resource::Mem],
            now: 1_000,
        };

        let outcome = generate(&params);
        assert!(outcome.events.is_empty());
        assert_eq!(outcome.skipped_rules.len(), 1);
    }
}
