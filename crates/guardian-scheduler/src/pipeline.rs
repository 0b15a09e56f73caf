//! The per-structure tick pipeline (§5 ordering).
//!
//! `get usages -> get limits -> repair+write limits -> generate events ->
//! write events -> read all events -> delete stale -> reduce -> evaluate
//! request-rules -> delete consumed events -> write requests`. Every step
//! talks to `DocStore`/`MetricsClient` in this order; later steps depend
//! on earlier writes being visible, so this function must not reorder or
//! parallelize its own steps (cross-structure parallelism lives one layer
//! up, in [`crate::tick`]).

use std::time::Instant;

use guardian_core::{Config, EventListeners, GuardianResult, Rule, Structure, StructureSubtype, TickEvent};
use guardian_docstore::DocStore;
use guardian_events::{age, generate, reduce, GenerateParams};
use guardian_metrics::{is_unmonitored, query_structure_usage, MetricsClient};
use guardian_requests::{generate_requests, RequestParams};

/// Runs one structure's slice of a tick. Returns `Ok(())` whether or not
/// anything was written -- an unmonitored or limit-less structure is a
/// normal skip, not a failure, and is reported to `listeners` instead of
/// via the `Err` path. `Err` is reserved for DocStore/MetricsClient
/// failures and state-invariant faults (§7), which the caller
/// ([`crate::tick::run_tick`]) isolates per task.
pub async fn run_structure_tick(
    structure: &Structure,
    rules: &[Rule],
    docs: &dyn DocStore,
    metrics: &dyn MetricsClient,
    config: &Config,
    listeners: &EventListeners<TickEvent>,
    now: i64,
) -> GuardianResult<()> {
    let usages = query_structure_usage(
        metrics,
        &structure.name,
        structure.subtype,
        config.window_timelapse.as_secs(),
        config.window_delay.as_secs(),
        now,
    )
    .await?;

    if is_unmonitored(&usages) {
        listeners.emit(&TickEvent::StructureSkipped {
            structure: structure.name.clone(),
            reason: "no usage data for any guardable resource".to_string(),
            timestamp: Instant::now(),
        });
        return Ok(());
    }

    let Some(mut limits) = docs.get_limits(&structure.name).await? else {
        listeners.emit(&TickEvent::StructureSkipped {
            structure: structure.name.clone(),
            reason: "no limits document".to_string(),
            timestamp: Instant::now(),
        });
        return Ok(());
    };

    // §4.4 point 5: applications have no `current`, so the repairer does
    // not run for them; their limits are assumed externally maintained.
    if structure.subtype == StructureSubtype::Container {
        let outcomes = guardian_state::run(&structure.resources, &mut limits.resources, &config.guardable_resources)?;
        for (resource, outcome) in outcomes {
            if outcome.repaired {
                listeners.emit(&TickEvent::RepairPerformed {
                    structure: structure.name.clone(),
                    resource: resource.as_str(),
                    timestamp: Instant::now(),
                });
            }
        }
        docs.update_limit(&limits).await?;
    }

    let generated = generate(&GenerateParams {
        structure_name: &structure.name,
        rules,
        usages: &usages,
        limits: &limits,
        resources: &structure.resources,
        guardable_resources: &config.guardable_resources,
        now,
    });

    for resource in &generated.resources_without_rules {
        listeners.emit(&TickEvent::NoRulesForResource {
            structure: structure.name.clone(),
            resource: resource.as_str(),
            timestamp: Instant::now(),
        });
    }
    for event in &generated.events {
        listeners.emit(&TickEvent::EventGenerated {
            structure: structure.name.clone(),
            resource: event.resource.as_str(),
            timestamp: Instant::now(),
        });
    }
    if !generated.events.is_empty() {
        docs.add_events(&generated.events).await?;
    }

    let all_events = docs.get_events(&structure.name).await?;
    let age_outcome = age(all_events, config.event_timeout.as_secs() as i64, now);
    if !age_outcome.stale.is_empty() {
        docs.delete_events(&age_outcome.stale).await?;
    }

    let reduced = reduce(&age_outcome.valid);

    let request_outcome = generate_requests(&RequestParams {
        structure,
        rules,
        reduced: &reduced,
        limits: &limits,
        usages: &usages,
        cpu_shares_per_watt: config.cpu_shares_per_watt,
        now,
    });

    for (event_name, n) in &request_outcome.events_to_remove {
        docs.delete_num_events_by_structure(&structure.name, event_name, *n).await?;
    }

    if !request_outcome.requests.is_empty() {
        for request in &request_outcome.requests {
            listeners.emit(&TickEvent::RequestEmitted {
                structure: structure.name.clone(),
                resource: request.resource.as_str(),
                amount: request.amount,
                timestamp: Instant::now(),
            });
        }
        docs.add_requests(&request_outcome.requests).await?;
    }

    Ok(())
}
