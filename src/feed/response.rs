//! Instant-query response envelope.
//!
//! ```text
//! {"status": "success",
//!  "data": {"resultType": "vector",
//!           "result": [{"metric": {"instance": "svc-1:8000", ...},
//!                       "value": [1718000000.123, "1"]}]}}
//! ```

use std::collections::HashMap;
use serde::Deserialize;
use serde_json::Value;

use crate::feed::client::FeedError;

/// A single health reading for one instance.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthSample {
    pub instance: String,
    pub value: f64,
    /// Sample timestamp reported by the backend (seconds since epoch).
    pub timestamp: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueryEnvelope {
    pub status: String,
    #[serde(default)]
    pub data: Option<QueryData>,
    #[serde(default, rename = "errorType")]
    pub error_type: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueryData {
    #[serde(default)]
    pub result: Vec<QueryResult>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueryResult {
    #[serde(default)]
    pub metric: HashMap<String, String>,
    #[serde(default)]
    pub value: Vec<Value>,
}

/// Label names used to derive the instance key.
#[derive(Debug, Clone)]
pub struct InstanceLabels {
    pub primary: String,
    pub fallback: String,
}

impl Default for InstanceLabels {
    fn default() -> Self {
        Self {
            primary: "instance".to_string(),
            fallback: "job".to_string(),
        }
    }
}

impl InstanceLabels {
    fn resolve<'a>(&self, metric: &'a HashMap<String, String>) -> Option<&'a str> {
        [&self.primary, &self.fallback]
            .into_iter()
            .filter_map(|label| metric.get(label))
            .map(String::as_str)
            .find(|v| !v.is_empty())
    }
}

/// Extract samples from a decoded envelope.
///
/// A non-success envelope is a failed query, not an empty answer. Series
/// without an instance label or with an unparseable value are skipped.
pub(crate) fn extract_samples(
    envelope: QueryEnvelope,
    labels: &InstanceLabels,
) -> Result<Vec<HealthSample>, FeedError> {
    if envelope.status != "success" {
        let error = match (envelope.error_type, envelope.error) {
            (Some(kind), Some(error)) => format!("{}: {}", kind, error),
            (None, Some(error)) | (Some(error), None) => error,
            (None, None) => "no error reported".to_string(),
        };
        return Err(FeedError::Query {
            status: envelope.status,
            error,
        });
    }

    let results = envelope.data.map(|d| d.result).unwrap_or_default();
    let mut samples = Vec::with_capacity(results.len());

    for result in results {
        let Some(instance) = labels.resolve(&result.metric) else {
            tracing::debug!(labels = ?result.metric, "Skipping series without instance label");
            continue;
        };

        let Some(value) = result.value.get(1).and_then(parse_number) else {
            tracing::debug!(instance, raw = ?result.value, "Skipping series with unparseable value");
            continue;
        };
        if value.is_nan() {
            tracing::debug!(instance, "Skipping NaN sample");
            continue;
        }

        let timestamp = result.value.first().and_then(parse_number).unwrap_or_default();
        samples.push(HealthSample {
            instance: instance.to_string(),
            value,
            timestamp,
        });
    }

    Ok(samples)
}

/// Decode a raw response body into samples.
pub fn parse_samples(body: &str, labels: &InstanceLabels) -> Result<Vec<HealthSample>, FeedError> {
    let envelope: QueryEnvelope = serde_json::from_str(body)?;
    extract_samples(envelope, labels)
}

fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Vec<HealthSample> {
        parse_samples(body, &InstanceLabels::default()).unwrap()
    }

    #[test]
    fn test_parses_vector_result() {
        let samples = parse(
            r#"{"status":"success","data":{"resultType":"vector","result":[
                {"metric":{"__name__":"inventory_service_state","instance":"api-1:8000"},"value":[1718000000.5,"1"]},
                {"metric":{"instance":"api-2:8000"},"value":[1718000000.5,"0"]}
            ]}}"#,
        );

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].instance, "api-1:8000");
        assert_eq!(samples[0].value, 1.0);
        assert_eq!(samples[0].timestamp, 1718000000.5);
        assert_eq!(samples[1].value, 0.0);
    }

    #[test]
    fn test_falls_back_to_job_label() {
        let samples = parse(
            r#"{"status":"success","data":{"result":[
                {"metric":{"job":"inventory"},"value":[1,"2"]},
                {"metric":{"instance":"","job":"billing"},"value":[1,"0"]}
            ]}}"#,
        );
        let keys: Vec<_> = samples.iter().map(|s| s.instance.as_str()).collect();
        assert_eq!(keys, vec!["inventory", "billing"]);
    }

    #[test]
    fn test_skips_bad_entries() {
        let samples = parse(
            r#"{"status":"success","data":{"result":[
                {"metric":{},"value":[1,"1"]},
                {"metric":{"instance":"a:1"},"value":[1,"degraded"]},
                {"metric":{"instance":"b:1"},"value":[1]},
                {"metric":{"instance":"c:1"},"value":[1,"NaN"]},
                {"metric":{"instance":"d:1"},"value":[1,2]}
            ]}}"#,
        );
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].instance, "d:1");
        assert_eq!(samples[0].value, 2.0);
    }

    #[test]
    fn test_error_status_is_query_failure() {
        let result = parse_samples(
            r#"{"status":"error","errorType":"bad_data","error":"parse error"}"#,
            &InstanceLabels::default(),
        );
        match result {
            Err(FeedError::Query { status, error }) => {
                assert_eq!(status, "error");
                assert_eq!(error, "bad_data: parse error");
            }
            other => panic!("expected query failure, got {:?}", other),
        }
    }

    #[test]
    fn test_success_without_data() {
        assert!(parse(r#"{"status":"success"}"#).is_empty());
    }

    #[test]
    fn test_malformed_body_is_error() {
        assert!(matches!(
            parse_samples("<html>502</html>", &InstanceLabels::default()),
            Err(FeedError::Malformed(_))
        ));
    }
}
