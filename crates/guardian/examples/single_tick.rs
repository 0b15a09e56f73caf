//! Runs a single Guardian tick against in-memory DocStore/MetricsClient
//! doubles instead of a live CouchDB/OpenTSDB deployment -- useful for
//! trying out a rule set locally before wiring up `GUARDIAN_DOCSTORE_URL`/
//! `GUARDIAN_METRICS_URL` against a real store.
//!
//! This reproduces scenario S1 from the rescale-amount specification: a
//! container at 70% of its allowed range, usage pinned above its `upper`
//! limit for three straight ticks, triggers a `fit_to_usage` request
//! clamped to the structure's `max`.

use std::collections::HashMap;
use std::sync::Arc;

use guardian_core::{
    Generates, GuardPolicy, HostInfo, Limits, Resource, ResourceLimits, ResourceState, Rule,
    RuleAction, RuleActionEvents, ScaleCounters, Structure, StructureSubtype,
};
use guardian_docstore::InMemoryDocStore;
use guardian_metrics::InMemoryMetricsClient;
use guardian_scheduler::TickScheduler;

fn node0() -> Structure {
    Structure {
        name: "node0".to_string(),
        subtype: StructureSubtype::Container,
        guard: true,
        guard_policy: GuardPolicy::Serverless,
        host: Some(HostInfo {
            host: "host0".to_string(),
            host_rescaler_ip: "10.0.0.1".to_string(),
            host_rescaler_port: 8000,
        }),
        resources: HashMap::from([(
            Resource::Cpu,
            ResourceState {
                min: 50,
                max: 200,
                current: Some(140),
                usage: None,
                guard: true,
            },
        )]),
    }
}

fn node0_limits() -> Limits {
    Limits {
        name: "node0".to_string(),
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

fn rules() -> Vec<Rule> {
    vec![
        Rule {
            name: "cpu_exceeded_upper".to_string(),
            active: true,
            resource: Resource::Cpu,
            rule: serde_json::json!({">=": [{"var": "structure.cpu.usage"}, {"var": "limits.cpu.upper"}]}),
            generates: Generates::Events,
            action: RuleAction {
                events: RuleActionEvents {
                    scale: ScaleCounters { up: 1, down: 0 },
                },
            },
            amount: None,
            rescale_by: None,
            events_to_remove: 0,
        },
        Rule {
            name: "cpu_high_events".to_string(),
            active: true,
            resource: Resource::Cpu,
            rule: serde_json::json!({">=": [{"var": "events.scale.up"}, 3]}),
            generates: Generates::Requests,
            action: RuleAction::default(),
            amount: None,
            rescale_by: Some(guardian_core::RescaleBy::FitToUsage),
            events_to_remove: 3,
        },
    ]
}

#[tokio::main]
async fn main() {
    let docs = Arc::new(InMemoryDocStore::with_structures(vec![node0()]));
    docs.seed_rules(rules());
    docs.seed_limits(vec![node0_limits()]);
    docs.seed_service(guardian_docstore::ServiceDoc {
        name: "guardian".to_string(),
        heartbeat: "never".to_string(),
        config: serde_json::json!({ "ACTIVE": true, "STRUCTURE_GUARDED": "container" }),
    });

    // `query_structure_usage` tags container queries by structure name,
    // not by the `host` routing field -- see `guardian_metrics::tags`.
    let metrics = Arc::new(InMemoryMetricsClient::new());
    metrics.seed("node0", "structure.cpu.usage", 180.0);

    let scheduler = TickScheduler::new(docs.clone(), metrics, tokio::runtime::Handle::current());

    for tick in 0..3 {
        let outcome = scheduler.run_tick((tick * 10) as i64).await.expect("tick failed");
        println!("tick {tick}: considered={} skipped={}", outcome.structures_considered, outcome.structures_skipped);
    }

    println!("events remaining: {:?}", docs.events());
    println!("requests emitted: {:?}", docs.requests());
}
