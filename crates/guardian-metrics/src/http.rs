use std::collections::HashMap;

use async_trait::async_trait;
use guardian_core::{GuardianError, GuardianResult, NO_DATA};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{MetricsClient, UsageMap};

#[derive(Debug, Serialize)]
struct TsdbQuery {
    start: u64,
    end: u64,
    queries: Vec<TsdbSubQuery>,
}

#[derive(Debug, Serialize)]
struct TsdbSubQuery {
    aggregator: &'static str,
    metric: String,
    tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct TsdbSeries {
    dps: HashMap<String, f64>,
}

/// A MetricsClient over an OpenTSDB-like `/api/query` endpoint.
///
/// Mirrors the facade shape of `guardian_docstore::HttpDocStore`: a thin
/// `reqwest::Client` wrapper, one request per source metric, results
/// merged client-side since the window/aggregator contract (§4.2) spans
/// a *union* of source series rather than a single TSDB query.
#[derive(Debug, Clone)]
pub struct HttpMetricsClient {
    base_url: String,
    http: Client,
}

impl HttpMetricsClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: Client::new(),
        }
    }

    pub fn with_client(base_url: impl Into<String>, http: Client) -> Self {
        Self {
            base_url: base_url.into(),
            http,
        }
    }

    async fn mean_of_series(&self, metric: &str, tags: &HashMap<String, String>, start: u64, end: u64) -> GuardianResult<Option<f64>> {
        let body = TsdbQuery {
            start,
            end,
            queries: vec![TsdbSubQuery {
                aggregator: "avg",
                metric: metric.to_string(),
                tags: tags.clone(),
            }],
        };

        let resp = self
            .http
            .post(format!("{}/api/query", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| GuardianError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(GuardianError::Transport(format!("metrics query {metric} -> {}", resp.status())));
        }

        let series: Vec<TsdbSeries> = resp.json().await.map_err(|e| GuardianError::Transport(e.to_string()))?;
        let points: Vec<f64> = series.into_iter().flat_map(|s| s.dps.into_values()).collect();
        if points.is_empty() {
            return Ok(None);
        }
        Ok(Some(points.iter().sum::<f64>() / points.len() as f64))
    }
}

#[async_trait]
impl MetricsClient for HttpMetricsClient {
    async fn query(
        &self,
        tags: &HashMap<String, String>,
        window_seconds: u64,
        delay_seconds: u64,
        source_metrics: &HashMap<String, Vec<String>>,
        derived_metrics: &[String],
        now: i64,
    ) -> GuardianResult<UsageMap> {
        let now = now.max(0) as u64;
        let end = now.saturating_sub(delay_seconds);
        let start = end.saturating_sub(window_seconds);

        let mut result = UsageMap::with_capacity(derived_metrics.len());
        for derived in derived_metrics {
            let Some(sources) = source_metrics.get(derived) else {
                result.insert(derived.clone(), NO_DATA);
                continue;
            };

            let mut points = Vec::new();
            for source in sources {
                if let Some(mean) = self.mean_of_series(source, tags, start, end).await? {
                    points.push(mean);
                }
            }

            let value = if points.is_empty() {
                NO_DATA
            } else {
                points.iter().sum::<f64>() / points.len() as f64
            };
            result.insert(derived.clone(), value);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// The query window (`start`/`end`) must derive from the `now` passed
    /// in, not the wall clock, so a tick's components agree on one "now".
    #[tokio::test]
    async fn query_windows_off_the_passed_in_now_not_wall_clock() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/query"))
            .and(body_partial_json(json!({"start": 900, "end": 990})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"dps": {"900": 40.0, "950": 60.0}}])))
            .mount(&server)
            .await;

        let client = HttpMetricsClient::new(server.uri());
        let tags = HashMap::from([("structureid".to_string(), "node0".to_string())]);
        let source_metrics = HashMap::from([("structure.cpu.usage".to_string(), vec!["cpu.usage".to_string()])]);
        let derived_metrics = vec!["structure.cpu.usage".to_string()];

        let usages = client
            .query(&tags, 90, 10, &source_metrics, &derived_metrics, 1000)
            .await
            .unwrap();
        assert_eq!(usages["structure.cpu.usage"], 50.0);
    }

    /// A derived metric absent from `source_metrics` must yield `NO_DATA`
    /// without issuing any TSDB query for it.
    #[tokio::test]
    async fn unmapped_derived_metric_is_no_data() {
        let server = MockServer::start().await;
        let client = HttpMetricsClient::new(server.uri());

        let usages = client
            .query(&HashMap::new(), 90, 10, &HashMap::new(), &["structure.cpu.usage".to_string()], 1000)
            .await
            .unwrap();
        assert!(guardian_core::is_no_data(usages["structure.cpu.usage"]));
    }

    /// An empty-series response (no `dps` points across any source) also
    /// yields `NO_DATA`, distinguishing "queried but empty" from a mapping
    /// gap above.
    #[tokio::test]
    async fn empty_series_response_is_no_data() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"dps": {}}])))
            .mount(&server)
            .await;

        let client = HttpMetricsClient::new(server.uri());
        let tags = HashMap::from([("structureid".to_string(), "node0".to_string())]);
        let source_metrics = HashMap::from([("structure.cpu.usage".to_string(), vec!["cpu.usage".to_string()])]);
        let derived_metrics = vec!["structure.cpu.usage".to_string()];

        let usages = client.query(&tags, 90, 10, &source_metrics, &derived_metrics, 1000).await.unwrap();
        assert!(guardian_core::is_no_data(usages["structure.cpu.usage"]));
    }
}
