//! The Guardian's MetricsClient facade (component C2).
//!
//! Aggregates named OpenTSDB-like time series over a trailing window into
//! the handful of derived usage metrics the rest of the pipeline reads by
//! name (`structure.cpu.usage`, `structure.mem.usage`,
//! `structure.energy.usage`). A missing or empty series yields [`NO_DATA`]
//! rather than an error: the caller decides whether an all-`NO_DATA`
//! structure counts as unmonitored (§4.2, §8 property 7).

mod http;
#[cfg(any(test, feature = "test-util"))]
mod memory;
mod tags;

pub use http::HttpMetricsClient;
#[cfg(any(test, feature = "test-util"))]
pub use memory::InMemoryMetricsClient;
pub use tags::{derived_metrics_for, source_metrics_for, tag_key_for};

use std::collections::HashMap;

use async_trait::async_trait;
use guardian_core::{GuardianResult, StructureSubtype};

/// A single derived-metric aggregate, keyed by derived metric name
/// (e.g. `"structure.cpu.usage"`). Entries are `guardian_core::NO_DATA`
/// (`f64::NAN`) when the underlying series was missing or empty.
pub type UsageMap = HashMap<String, f64>;

/// Windowed time-series aggregation (§4.2).
///
/// `source_metrics` maps each derived metric to the raw series it is
/// computed from (typically their mean); `derived_metrics` lists which
/// derived metrics the caller wants back. Implementations fold
/// `source_metrics` tags with `tags` to scope the query to one structure.
#[async_trait]
pub trait MetricsClient: Send + Sync {
    async fn query(
        &self,
        tags: &HashMap<String, String>,
        window_seconds: u64,
        delay_seconds: u64,
        source_metrics: &HashMap<String, Vec<String>>,
        derived_metrics: &[String],
        now: i64,
    ) -> GuardianResult<UsageMap>;
}

/// Runs [`MetricsClient::query`] with the fixed container/application
/// mappings from §4.2, scoped to one structure by name.
///
/// `now` is the tick's single timestamp (see `TickScheduler::run_tick`); it
/// is forwarded into the query window computation so every component of one
/// tick agrees on "now" instead of each one sampling the wall clock itself.
pub async fn query_structure_usage(
    client: &dyn MetricsClient,
    structure_name: &str,
    subtype: StructureSubtype,
    window_seconds: u64,
    delay_seconds: u64,
    now: i64,
) -> GuardianResult<UsageMap> {
    let tag_key = tag_key_for(subtype);
    let tags = HashMap::from([(tag_key.to_string(), structure_name.to_string())]);
    let source_metrics = source_metrics_for(subtype);
    let derived_metrics = derived_metrics_for(subtype);
    client
        .query(&tags, window_seconds, delay_seconds, &source_metrics, &derived_metrics, now)
        .await
}

/// True when every entry in `usages` is [`guardian_core::NO_DATA`]: the
/// structure is unmonitored and the tick skips it (§4.2, property 7).
pub fn is_unmonitored(usages: &UsageMap) -> bool {
    !usages.is_empty() && usages.values().all(|v| guardian_core::is_no_data(*v))
}
