use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use guardian_core::{GuardianResult, NO_DATA};

use crate::{MetricsClient, UsageMap};

/// A fixed-response [`MetricsClient`] double for pipeline tests: seed it
/// with the `(tag_value, derived_metric) -> value` readings a scenario
/// wants, unseeded lookups fall back to [`NO_DATA`].
#[derive(Debug, Default)]
pub struct InMemoryMetricsClient {
    readings: Mutex<HashMap<(String, String), f64>>,
}

impl InMemoryMetricsClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, tag_value: impl Into<String>, derived_metric: impl Into<String>, value: f64) {
        self.readings.lock().unwrap().insert((tag_value.into(), derived_metric.into()), value);
    }
}

#[async_trait]
impl MetricsClient for InMemoryMetricsClient {
    async fn query(
        &self,
        tags: &HashMap<String, String>,
        _window_seconds: u64,
        _delay_seconds: u64,
        _source_metrics: &HashMap<String, Vec<String>>,
        derived_metrics: &[String],
        _now: i64,
    ) -> GuardianResult<UsageMap> {
        let tag_value = tags.values().next().cloned().unwrap_or_default();
        let readings = self.readings.lock().unwrap();
        Ok(derived_metrics
            .iter()
            .map(|metric| {
                let value = readings.get(&(tag_value.clone(), metric.clone())).copied().unwrap_or(NO_DATA);
                (metric.clone(), value)
            })
            .collect())
    }
}
