//! Metrics backend client.
//!
//! # Responsibilities
//! - Issue instant queries against the backend
//! - Decode the response into per-instance health values
//! - Convert every failure into "no data this cycle"

use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::FeedConfig;
use crate::feed::response::{parse_samples, HealthSample, InstanceLabels};

/// Path of the instant query endpoint, relative to the backend base URL.
pub const QUERY_PATH: &str = "api/v1/query";

/// Errors that can occur while querying the backend.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The backend URL could not be turned into a query URL.
    #[error("invalid backend URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Connection, timeout or body read failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("backend returned HTTP {0}")]
    Status(u16),

    /// The backend answered, but reported the query as failed.
    #[error("query failed with status '{status}': {error}")]
    Query { status: String, error: String },

    /// The body was not a query envelope.
    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Client for a Prometheus-compatible metrics backend.
#[derive(Debug, Clone)]
pub struct HealthFeedClient {
    http: reqwest::Client,
    query_url: Url,
    metric: String,
    labels: InstanceLabels,
}

impl HealthFeedClient {
    /// Create a client from the feed configuration.
    pub fn new(config: &FeedConfig) -> Result<Self, FeedError> {
        let query_url = query_url(&config.backend_url)?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("upstream-sentinel/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            query_url,
            metric: config.metric.clone(),
            labels: InstanceLabels {
                primary: config.instance_label.clone(),
                fallback: config.fallback_label.clone(),
            },
        })
    }

    /// Convenience constructor for an endpoint, metric and timeout.
    pub fn for_endpoint(endpoint: &str, metric: &str, timeout: Duration) -> Result<Self, FeedError> {
        let config = FeedConfig {
            backend_url: endpoint.to_string(),
            metric: metric.to_string(),
            timeout_secs: timeout.as_secs_f64(),
            ..FeedConfig::default()
        };
        Self::new(&config)
    }

    /// The metric expression this client queries.
    pub fn metric(&self) -> &str {
        &self.metric
    }

    /// Fetch the current samples, reporting why the query failed if it did.
    pub async fn fetch(&self) -> Result<Vec<HealthSample>, FeedError> {
        let mut url = self.query_url.clone();
        url.query_pairs_mut().append_pair("query", &self.metric);

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        parse_samples(&body, &self.labels)
    }

    /// Current health value per instance; empty when the backend is
    /// unavailable or its answer cannot be used.
    pub async fn query(&self) -> BTreeMap<String, f64> {
        match self.fetch().await {
            Ok(samples) => to_health_map(samples),
            Err(e) => {
                tracing::debug!(metric = %self.metric, error = %e, "Health feed query failed");
                BTreeMap::new()
            }
        }
    }
}

/// Fold samples into an instance → value map. A later duplicate wins.
pub fn to_health_map(samples: Vec<HealthSample>) -> BTreeMap<String, f64> {
    samples
        .into_iter()
        .map(|s| (s.instance, s.value))
        .collect()
}

fn query_url(base: &str) -> Result<Url, FeedError> {
    let invalid = |reason: String| FeedError::InvalidUrl {
        url: base.to_string(),
        reason,
    };

    let mut base_url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    if base_url.cannot_be_a_base() {
        return Err(invalid("URL cannot be a base".to_string()));
    }
    // Treat the base as a directory so `join` appends instead of replacing.
    if !base_url.path().ends_with('/') {
        let path = format!("{}/", base_url.path());
        base_url.set_path(&path);
    }
    base_url.join(QUERY_PATH).map_err(|e| invalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_url_joins_paths() {
        assert_eq!(
            query_url("http://localhost:9090").unwrap().as_str(),
            "http://localhost:9090/api/v1/query"
        );
        assert_eq!(
            query_url("http://localhost:9090/").unwrap().as_str(),
            "http://localhost:9090/api/v1/query"
        );
        assert_eq!(
            query_url("https://metrics.internal/prometheus").unwrap().as_str(),
            "https://metrics.internal/prometheus/api/v1/query"
        );
    }

    #[test]
    fn test_invalid_url() {
        assert!(matches!(
            query_url("localhost"),
            Err(FeedError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_health_map_is_sorted() {
        let samples = vec![
            HealthSample { instance: "b:1".into(), value: 1.0, timestamp: 0.0 },
            HealthSample { instance: "a:1".into(), value: 0.0, timestamp: 0.0 },
        ];
        let map = to_health_map(samples);
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec!["a:1", "b:1"]);
    }

    #[tokio::test]
    async fn test_unreachable_backend_returns_empty() {
        // Port 9 (discard) is essentially never bound on test machines.
        let client = HealthFeedClient::for_endpoint(
            "http://127.0.0.1:9",
            "inventory_service_state",
            Duration::from_millis(500),
        )
        .unwrap();

        assert!(client.fetch().await.is_err());
        assert!(client.query().await.is_empty());
    }
}
