use std::collections::HashMap;
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use guardian_core::{Event, Resource, ScaleCounters};
use guardian_events::{reduce, GenerateParams};
use guardian_rules::evaluate;

fn predicate() -> serde_json::Value {
    serde_json::json!({
        "and": [
            {">=": [{"var": "structure.cpu.usage"}, {"var": "limits.cpu.upper"}]},
            {"<": [{"var": "structure.cpu.current"}, {"var": "structure.cpu.max"}]}
        ]
    })
}

fn context() -> serde_json::Value {
    serde_json::json!({
        "limits": { "cpu": { "lower": 80, "upper": 120, "boundary": 20 } },
        "structure": { "cpu": { "min": 50, "max": 200, "current": 140, "usage": 180 } },
    })
}

fn bench_rule_evaluation(c: &mut Criterion) {
    let node = predicate();
    let ctx = context();

    c.bench_function("rule_eval_and_of_two_comparisons", |b| {
        b.iter(|| evaluate(black_box(&node), black_box(&ctx)));
    });
}

fn many_events(n: usize) -> Vec<Event> {
    (0..n)
        .map(|i| Event {
            name: "cpu_exceeded_upper".to_string(),
            resource: if i % 2 == 0 { Resource::Cpu } else { Resource::Mem },
            structure: "node0".to_string(),
            action: ScaleCounters { up: 1, down: 0 },
            timestamp: i as i64,
        })
        .collect()
}

fn bench_event_reduction(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_reduce");
    for size in [10usize, 100, 1_000] {
        let events = many_events(size);
        group.bench_function(format!("{size}_events"), |b| {
            b.iter(|| reduce(black_box(&events)));
        });
    }
    group.finish();
}

fn bench_event_generation(c: &mut Criterion) {
    use guardian_core::{Generates, Limits, ResourceLimits, ResourceState, Rule, RuleAction, RuleActionEvents};

    let rule = Rule {
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
    };
    let rules = vec![rule];

    let limits = Limits {
        name: "node0".to_string(),
        resources: HashMap::from([(
            Resource::Cpu,
            ResourceLimits {
                lower: 80,
                upper: 120,
                boundary: 20,
            },
        )]),
    };
    let resources = HashMap::from([(
        Resource::Cpu,
        ResourceState {
            min: 50,
            max: 200,
            current: Some(140),
            usage: None,
            guard: true,
        },
    )]);
    let usages = HashMap::from([("structure.cpu.usage".to_string(), 180.0)]);
    let guardable = [Resource::Cpu];

    c.bench_function("generate_events_single_rule", |b| {
        b.iter(|| {
            guardian_events::generate(black_box(&GenerateParams {
                structure_name: "node0",
                rules: &rules,
                usages: &usages,
                limits: &limits,
                resources: &resources,
                guardable_resources: &guardable,
                now: 0,
            }))
        });
    });
}

criterion_group!(benches, bench_rule_evaluation, bench_event_reduction, bench_event_generation);
criterion_main!(benches);
