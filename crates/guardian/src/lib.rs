//! The Guardian control loop: a policy engine with hysteresis for a
//! serverless-container resource-management framework.
//!
//! This crate is the daemon binary's library half: process-surface
//! concerns (environment-driven wiring, tracing init) that sit above the
//! component crates (`guardian-core`, `guardian-docstore`,
//! `guardian-metrics`, `guardian-state`, `guardian-events`,
//! `guardian-requests`, `guardian-scheduler`). Every decision the Guardian
//! makes -- the two-stage usage/event/request pipeline, the resource-state
//! invariant, the amount policies, the per-tick fan-out -- lives in those
//! crates; this one only assembles them into a runnable process (§6
//! "Process surface").

mod wiring;

pub use wiring::{env_config, init_tracing, EnvConfig, EnvConfigError};

use std::sync::Arc;

use guardian_docstore::HttpDocStore;
use guardian_metrics::HttpMetricsClient;
use guardian_scheduler::TickScheduler;

/// The concrete scheduler type the `guardian` binary runs: a live
/// CouchDB-like store, a live OpenTSDB-like metrics client, and the
/// current tokio runtime handle as the fan-out executor (§5: "a
/// thread-per-structure model or a bounded worker pool both satisfy the
/// contract" -- tokio's default multi-threaded scheduler is the bounded
/// worker pool this picks).
pub type LiveScheduler = TickScheduler<HttpDocStore, HttpMetricsClient, tokio::runtime::Handle>;

/// Builds the live scheduler from an [`EnvConfig`]. Exposed separately
/// from `main` so integration tests can construct the same wiring with a
/// mocked HTTP endpoint.
pub fn build_scheduler(config: &EnvConfig) -> LiveScheduler {
    let docs = Arc::new(HttpDocStore::new(config.docstore_url.clone()));
    let metrics = Arc::new(HttpMetricsClient::new(config.metrics_url.clone()));
    TickScheduler::new(docs, metrics, tokio::runtime::Handle::current())
}
