//! End-to-end tick scenarios against in-memory `DocStore`/`MetricsClient`
//! doubles, exercising the full `LoadConfig -> Heartbeat -> ListStructures
//! -> FanOut -> Join` pipeline rather than any single component in
//! isolation. Scenario numbers match the spec's testable-properties
//! section.

use std::collections::HashMap;
use std::sync::Arc;

use guardian_core::{
    GuardPolicy, HostInfo, Limits, Resource, ResourceLimits, ResourceState, Rule, RuleAction,
    RuleActionEvents, ScaleCounters, Structure, StructureSubtype,
};
use guardian_docstore::{InMemoryDocStore, ServiceDoc};
use guardian_metrics::InMemoryMetricsClient;
use guardian_scheduler::TickScheduler;

fn node(name: &str, current: i64) -> Structure {
    Structure {
        name: name.to_string(),
        subtype: StructureSubtype::Container,
        guard: true,
        guard_policy: GuardPolicy::Serverless,
        host: Some(HostInfo {
            host: format!("{name}-host"),
            host_rescaler_ip: "10.0.0.1".to_string(),
            host_rescaler_port: 8000,
        }),
        resources: HashMap::from([(
            Resource::Cpu,
            ResourceState {
                min: 50,
                max: 200,
                current: Some(current),
                usage: None,
                guard: true,
            },
        )]),
    }
}

fn limits(name: &str) -> Limits {
    Limits {
        name: name.to_string(),
        resources: HashMap::from([(
            Resource::Cpu,
            ResourceLimits {
                lower: 80,
                upper: 120,
                boundary: 20,
            },
        )]),
    }
}

fn event_rule() -> Rule {
    Rule {
        name: "cpu_exceeded_upper".to_string(),
        active: true,
        resource: Resource::Cpu,
        rule: serde_json::json!({">=": [{"var": "structure.cpu.usage"}, {"var": "limits.cpu.upper"}]}),
        generates: guardian_core::Generates::Events,
        action: RuleAction {
            events: RuleActionEvents {
                scale: ScaleCounters { up: 1, down: 0 },
            },
        },
        amount: None,
        rescale_by: None,
        events_to_remove: 0,
    }
}

fn request_rule() -> Rule {
    Rule {
        name: "cpu_high_events".to_string(),
        active: true,
        resource: Resource::Cpu,
        rule: serde_json::json!({">=": [{"var": "events.scale.up"}, 3]}),
        generates: guardian_core::Generates::Requests,
        action: RuleAction::default(),
        amount: None,
        rescale_by: Some(guardian_core::RescaleBy::FitToUsage),
        events_to_remove: 3,
    }
}

fn seeded_service() -> ServiceDoc {
    ServiceDoc {
        name: "guardian".to_string(),
        heartbeat: "never".to_string(),
        config: serde_json::json!({ "ACTIVE": true, "STRUCTURE_GUARDED": "container" }),
    }
}

/// S1: three straight ticks with usage above `upper` produce exactly
/// three events and, on the third tick, a `fit_to_usage` request clamped
/// to the structure's `max`.
#[tokio::test]
async fn s1_three_ticks_emit_clamped_fit_to_usage_request() {
    let docs = Arc::new(InMemoryDocStore::with_structures(vec![node("node0", 140)]));
    docs.seed_rules(vec![event_rule(), request_rule()]);
    docs.seed_limits(vec![limits("node0")]);
    docs.seed_service(seeded_service());

    let metrics = Arc::new(InMemoryMetricsClient::new());
    metrics.seed("node0", "structure.cpu.usage", 180.0);

    let scheduler = TickScheduler::new(docs.clone(), metrics, tokio::runtime::Handle::current());

    for tick in 0..3 {
        let outcome = scheduler.run_tick(tick * 10).await.unwrap();
        assert_eq!(outcome.structures_skipped, 0);
    }

    let requests = docs.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].resource, Resource::Cpu);
    assert_eq!(requests[0].amount, 60);
    assert_eq!(requests[0].host.as_deref(), Some("node0-host"));

    // The triggering events were consumed, not left to accumulate.
    assert!(docs.events().is_empty());
}

/// S2: identical setup but `current` is already at `max` -- the computed
/// amount clamps to zero, so no request document is written, but the
/// triggering events are still consumed.
#[tokio::test]
async fn s2_clamped_to_zero_writes_no_request() {
    let docs = Arc::new(InMemoryDocStore::with_structures(vec![node("node0", 200)]));
    docs.seed_rules(vec![event_rule(), request_rule()]);
    docs.seed_limits(vec![limits("node0")]);
    docs.seed_service(seeded_service());

    let metrics = Arc::new(InMemoryMetricsClient::new());
    metrics.seed("node0", "structure.cpu.usage", 180.0);

    let scheduler = TickScheduler::new(docs.clone(), metrics, tokio::runtime::Handle::current());
    for tick in 0..3 {
        scheduler.run_tick(tick * 10).await.unwrap();
    }

    assert!(docs.requests().is_empty());
    assert!(docs.events().is_empty());
}

/// Property 7: a structure with no usage data for any guardable resource
/// is skipped entirely -- no limits repair, no events, no requests.
#[tokio::test]
async fn unmonitored_structure_is_skipped_without_side_effects() {
    let docs = Arc::new(InMemoryDocStore::with_structures(vec![node("dark0", 140)]));
    docs.seed_rules(vec![event_rule(), request_rule()]);
    docs.seed_limits(vec![limits("dark0")]);
    docs.seed_service(seeded_service());

    // No seeded reading: every derived metric resolves to NO_DATA.
    let metrics = Arc::new(InMemoryMetricsClient::new());

    let scheduler = TickScheduler::new(docs.clone(), metrics, tokio::runtime::Handle::current());
    let outcome = scheduler.run_tick(0).await.unwrap();

    assert_eq!(outcome.structures_skipped, 1);
    assert!(docs.events().is_empty());
    assert!(docs.requests().is_empty());
    // Limits were never touched by the repairer.
    assert_eq!(docs.get_limits("dark0").await.unwrap(), Some(limits("dark0")));
}

/// `guard == false` structures never enter the fan-out step at all.
#[tokio::test]
async fn unguarded_structure_is_skipped() {
    let mut structure = node("node0", 140);
    structure.guard = false;
    let docs = Arc::new(InMemoryDocStore::with_structures(vec![structure]));
    docs.seed_rules(vec![event_rule()]);
    docs.seed_limits(vec![limits("node0")]);
    docs.seed_service(seeded_service());

    let metrics = Arc::new(InMemoryMetricsClient::new());
    metrics.seed("node0", "structure.cpu.usage", 180.0);

    let scheduler = TickScheduler::new(docs.clone(), metrics, tokio::runtime::Handle::current());
    let outcome = scheduler.run_tick(0).await.unwrap();

    assert_eq!(outcome.structures_considered, 1);
    assert_eq!(outcome.structures_skipped, 1);
    assert!(docs.events().is_empty());
}

/// `ACTIVE == false` loads config and heartbeats but never fans out.
#[tokio::test]
async fn inactive_service_skips_fan_out_entirely() {
    let docs = Arc::new(InMemoryDocStore::with_structures(vec![node("node0", 140)]));
    docs.seed_rules(vec![event_rule()]);
    docs.seed_limits(vec![limits("node0")]);
    docs.seed_service(ServiceDoc {
        name: "guardian".to_string(),
        heartbeat: "never".to_string(),
        config: serde_json::json!({ "ACTIVE": false }),
    });

    let metrics = Arc::new(InMemoryMetricsClient::new());
    metrics.seed("node0", "structure.cpu.usage", 180.0);

    let scheduler = TickScheduler::new(docs.clone(), metrics, tokio::runtime::Handle::current());
    let outcome = scheduler.run_tick(0).await.unwrap();

    assert_eq!(outcome.structures_considered, 0);
    assert!(docs.events().is_empty());
    // Heartbeat still happened.
    assert_eq!(docs.get_service("guardian").await.unwrap().heartbeat, "0");
}

/// S4: limits whose `upper` has drifted to meet `current` get repaired
/// back to a valid `(lower, upper, boundary)` chain before any rule runs.
#[tokio::test]
async fn s4_invalid_limits_are_repaired_before_rule_evaluation() {
    let docs = Arc::new(InMemoryDocStore::with_structures(vec![node("node0", 140)]));
    docs.seed_rules(vec![]);
    docs.seed_limits(vec![Limits {
        name: "node0".to_string(),
        resources: HashMap::from([(
            Resource::Cpu,
            ResourceLimits {
                lower: 200,
                upper: 200,
                boundary: 20,
            },
        )]),
    }]);
    docs.seed_service(seeded_service());

    let metrics = Arc::new(InMemoryMetricsClient::new());
    metrics.seed("node0", "structure.cpu.usage", 100.0);

    let scheduler = TickScheduler::new(docs.clone(), metrics, tokio::runtime::Handle::current());
    scheduler.run_tick(0).await.unwrap();

    let repaired = docs.get_limits("node0").await.unwrap().unwrap();
    let cpu = repaired.resources[&Resource::Cpu];
    assert_eq!(cpu.upper, 120);
    assert_eq!(cpu.lower, 100);
}

/// Structures with a non-serverless (or unknown) guard policy are left
/// to whatever controller owns that policy.
#[tokio::test]
async fn non_serverless_guard_policy_is_skipped() {
    let mut structure = node("node0", 140);
    structure.guard_policy = GuardPolicy::Fixed;
    let docs = Arc::new(InMemoryDocStore::with_structures(vec![structure]));
    docs.seed_rules(vec![event_rule()]);
    docs.seed_limits(vec![limits("node0")]);
    docs.seed_service(seeded_service());

    let metrics = Arc::new(InMemoryMetricsClient::new());
    metrics.seed("node0", "structure.cpu.usage", 180.0);

    let scheduler = TickScheduler::new(docs.clone(), metrics, tokio::runtime::Handle::current());
    let outcome = scheduler.run_tick(0).await.unwrap();

    assert_eq!(outcome.structures_skipped, 1);
    assert!(docs.events().is_empty());
}
