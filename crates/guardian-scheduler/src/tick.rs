//! The `TickScheduler` state machine (component C8, §4.8):
//!
//! ```text
//! Idle -> LoadConfig -> Heartbeat -> ListStructures -> FanOut -> Join -> Sleep(WINDOW_TIMELAPSE) -> Idle
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use guardian_core::{Config, EventListeners, GuardPolicy, GuardianResult, StructureGuarded, StructureSubtype, TickEvent};
use guardian_docstore::DocStore;
use guardian_metrics::MetricsClient;

use crate::executor::Executor;
use crate::pipeline::run_structure_tick;

/// `_id` of the Guardian's own document in the `services` collection.
pub const SERVICE_NAME: &str = "guardian";

/// What one call to [`TickScheduler::run_tick`] did.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickOutcome {
    pub structures_considered: usize,
    pub structures_skipped: usize,
    /// `Some(delay)` when `Join` landed after the next tick was already
    /// due (§4.8 `Join`); never enforced, only reported.
    pub overrun: Option<Duration>,
}

fn now_epoch_secs() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before epoch").as_secs() as i64
}

fn subtype_for(guarded: StructureGuarded) -> StructureSubtype {
    match guarded {
        StructureGuarded::Container => StructureSubtype::Container,
        StructureGuarded::Application => StructureSubtype::Application,
    }
}

/// Periodic driver over `D`/`M`/`X`, generic the way the teacher's
/// resilience layers are generic over the service they wrap.
pub struct TickScheduler<D, M, X> {
    docs: Arc<D>,
    metrics: Arc<M>,
    executor: X,
    listeners: EventListeners<TickEvent>,
}

impl<D, M, X> TickScheduler<D, M, X>
where
    D: DocStore + 'static,
    M: MetricsClient + 'static,
    X: Executor,
{
    pub fn new(docs: Arc<D>, metrics: Arc<M>, executor: X) -> Self {
        Self {
            docs,
            metrics,
            executor,
            listeners: EventListeners::new(),
        }
    }

    pub fn listeners_mut(&mut self) -> &mut EventListeners<TickEvent> {
        &mut self.listeners
    }

    /// Runs `LoadConfig -> Heartbeat -> ListStructures -> FanOut -> Join`
    /// once, at the given `now` (epoch seconds). Exposed with an explicit
    /// `now` for deterministic tests; [`Self::run_tick_now`] wraps this
    /// with the wall clock for production use.
    pub async fn run_tick(&self, now: i64) -> GuardianResult<TickOutcome> {
        let started = Instant::now();

        // LoadConfig
        let service = self.docs.get_service(SERVICE_NAME).await?;
        let config = Config::merge_from_service_config(&service.config);

        // Heartbeat
        self.docs.heartbeat(SERVICE_NAME, &now.to_string()).await?;

        if !config.active {
            return Ok(TickOutcome::default());
        }

        // ListStructures
        let structures = self.docs.get_structures(Some(subtype_for(config.structure_guarded))).await?;
        let rules = Arc::new(self.docs.get_rules().await?);
        let config = Arc::new(config);

        // FanOut: only guard==true, guard_policy==serverless structures get
        // the serverless pipeline -- `fixed`/`unknown` policies are other
        // controllers' responsibility (§3: "only serverless is active
        // here").
        let mut handles = Vec::new();
        let mut skipped = 0usize;
        for structure in structures {
            if !structure.guard || structure.guard_policy != GuardPolicy::Serverless {
                self.listeners.emit(&TickEvent::StructureSkipped {
                    structure: structure.name.clone(),
                    reason: "guard is off or guard_policy is not serverless".to_string(),
                    timestamp: Instant::now(),
                });
                skipped += 1;
                continue;
            }

            let docs = Arc::clone(&self.docs);
            let metrics = Arc::clone(&self.metrics);
            let rules = Arc::clone(&rules);
            let config = Arc::clone(&config);
            let listeners = self.listeners.clone();

            handles.push(self.executor.spawn(async move {
                let result = run_structure_tick(&structure, &rules, docs.as_ref(), metrics.as_ref(), &config, &listeners, now).await;
                (structure.name, result)
            }));
        }

        let considered = handles.len() + skipped;

        // Join: a panicking or erroring task is isolated here and never
        // aborts the rest (§4.8, §7).
        for handle in handles {
            match handle.await {
                Ok((_, Ok(()))) => {}
                Ok((name, Err(err))) => {
                    skipped += 1;
                    self.listeners.emit(&TickEvent::StructureSkipped {
                        structure: name,
                        reason: err.to_string(),
                        timestamp: Instant::now(),
                    });
                }
                Err(join_err) => {
                    skipped += 1;
                    self.listeners.emit(&TickEvent::StructureSkipped {
                        structure: "<unknown>".to_string(),
                        reason: format!("task panicked: {join_err}"),
                        timestamp: Instant::now(),
                    });
                }
            }
        }

        let elapsed = started.elapsed();
        let overrun = elapsed.checked_sub(config.window_timelapse).filter(|d| !d.is_zero());
        if let Some(delay) = overrun {
            self.listeners.emit(&TickEvent::TickOverrun {
                delay,
                timestamp: Instant::now(),
            });
        }

        Ok(TickOutcome {
            structures_considered: considered,
            structures_skipped: skipped,
            overrun,
        })
    }

    pub async fn run_tick_now(&self) -> GuardianResult<TickOutcome> {
        self.run_tick(now_epoch_secs()).await
    }

    /// Runs ticks back to back, sleeping the remainder of
    /// `WINDOW_TIMELAPSE` between them. On overrun, the next tick starts
    /// immediately rather than double-scheduling (§4.8 `Join`).
    pub async fn run_forever(&self) -> GuardianResult<()> {
        loop {
            let tick_start = Instant::now();
            let window = self.current_window_timelapse().await?;
            self.run_tick_now().await?;

            let elapsed = tick_start.elapsed();
            if let Some(remaining) = window.checked_sub(elapsed) {
                tokio::time::sleep(remaining).await;
            }
        }
    }

    async fn current_window_timelapse(&self) -> GuardianResult<Duration> {
        let service = self.docs.get_service(SERVICE_NAME).await?;
        Ok(Config::merge_from_service_config(&service.config).window_timelapse)
    }
}
