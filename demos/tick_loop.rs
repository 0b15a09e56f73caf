//! Runs several Guardian ticks back to back against in-memory doubles and
//! prints the per-tick event/request activity, reproducing the aging
//! scenario from the testable-properties section: five events at
//! different ages, only the ones inside `EVENT_TIMEOUT` survive each
//! tick's `age` step.

use std::collections::HashMap;
use std::sync::Arc;

use guardian_core::{
    Generates, GuardPolicy, Resource, ResourceLimits, ResourceState, Rule, RuleAction,
    RuleActionEvents, ScaleCounters, Structure, StructureSubtype,
};
use guardian_docstore::{InMemoryDocStore, ServiceDoc};
use guardian_metrics::InMemoryMetricsClient;
use guardian_scheduler::TickScheduler;

fn structure() -> Structure {
    Structure {
        name: "app0".to_string(),
        subtype: StructureSubtype::Container,
        guard: true,
        guard_policy: GuardPolicy::Serverless,
        host: None,
        resources: HashMap::from([(
            Resource::Cpu,
            ResourceState {
                min: 20,
                max: 120,
                current: Some(80),
                usage: None,
                guard: true,
            },
        )]),
    }
}

fn limits() -> guardian_core::Limits {
    guardian_core::Limits {
        name: "app0".to_string(),
        resources: HashMap::from([(
            Resource::Cpu,
            ResourceLimits {
                lower: 40,
                upper: 60,
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
        generates: Generates::Events,
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

#[tokio::main]
async fn main() {
    let docs = Arc::new(InMemoryDocStore::with_structures(vec![structure()]));
    docs.seed_rules(vec![event_rule()]);
    docs.seed_limits(vec![limits()]);
    docs.seed_service(ServiceDoc {
        name: "guardian".to_string(),
        heartbeat: "never".to_string(),
        config: serde_json::json!({ "ACTIVE": true, "EVENT_TIMEOUT": 40 }),
    });

    let metrics = Arc::new(InMemoryMetricsClient::new());
    metrics.seed("app0", "structure.cpu.usage", 65.0);

    let scheduler = TickScheduler::new(docs.clone(), metrics, tokio::runtime::Handle::current());

    for now in [0, 10, 20, 30, 40, 50] {
        scheduler.run_tick(now).await.expect("tick failed");
        println!("t={now}: {} events stored", docs.events().len());
    }
}
