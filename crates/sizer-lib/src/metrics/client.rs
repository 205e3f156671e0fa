//! HTTP client for the Prometheus query API
//!
//! Executes instant queries against `/api/v1/query` and decodes the
//! response envelope into typed results. Float parsing of sample values is
//! left to the reducer.

use super::MetricsStore;
use crate::error::MetricsError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// A `[timestamp, "value"]` pair as returned by the query API
pub type SamplePoint = (f64, String);

/// One series of an instant vector
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InstantSample {
    #[serde(default)]
    pub metric: BTreeMap<String, String>,
    pub value: SamplePoint,
}

/// One series of a range vector
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RangeSeries {
    #[serde(default)]
    pub metric: BTreeMap<String, String>,
    #[serde(default)]
    pub values: Vec<SamplePoint>,
}

/// Query result tagged by `resultType`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "resultType", content = "result", rename_all = "lowercase")]
pub enum QueryResult {
    Vector(Vec<InstantSample>),
    Matrix(Vec<RangeSeries>),
    Scalar(SamplePoint),
    #[serde(rename = "string")]
    Text(SamplePoint),
}

impl QueryResult {
    /// Name of the result type as the API reports it
    pub fn kind(&self) -> &'static str {
        match self {
            QueryResult::Vector(_) => "vector",
            QueryResult::Matrix(_) => "matrix",
            QueryResult::Scalar(_) => "scalar",
            QueryResult::Text(_) => "string",
        }
    }
}

/// Result of an instant query plus any warnings the store attached
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse {
    pub result: QueryResult,
    pub warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ApiStatus {
    Success,
    Error,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEnvelope {
    status: ApiStatus,
    data: Option<QueryResult>,
    #[serde(default)]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    warnings: Vec<String>,
}

/// Configuration for the Prometheus client
#[derive(Debug, Clone)]
pub struct PrometheusConfig {
    /// Base address of the store (e.g., "http://prometheus:9090")
    pub endpoint: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://prometheus:9090".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Long-lived Prometheus API client shared across admission calls
#[derive(Debug, Clone)]
pub struct PrometheusClient {
    client: Client,
    query_url: Url,
}

impl PrometheusClient {
    /// Create a client for the configured endpoint
    pub fn new(config: &PrometheusConfig) -> Result<Self, MetricsError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        // Keep any path prefix on the base address when joining
        let mut base = config.endpoint.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let query_url = Url::parse(&base)
            .and_then(|url| url.join("api/v1/query"))
            .map_err(|source| MetricsError::InvalidEndpoint {
                endpoint: config.endpoint.clone(),
                source,
            })?;

        Ok(Self { client, query_url })
    }

    /// Full URL of the instant query endpoint
    pub fn query_url(&self) -> &Url {
        &self.query_url
    }
}

#[async_trait]
impl MetricsStore for PrometheusClient {
    async fn instant_query(
        &self,
        query: &str,
        at: DateTime<Utc>,
    ) -> Result<QueryResponse, MetricsError> {
        let time = format!("{:.3}", at.timestamp_millis() as f64 / 1000.0);
        debug!(url = %self.query_url, query = %query, time = %time, "Executing instant query");

        let response = self
            .client
            .get(self.query_url.clone())
            .query(&[("query", query), ("time", time.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        let envelope: ApiEnvelope = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(MetricsError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
            Err(err) => return Err(MetricsError::Decode(err)),
        };

        match envelope.status {
            ApiStatus::Error => Err(MetricsError::Api {
                error_type: envelope.error_type.unwrap_or_else(|| "unknown".to_string()),
                error: envelope.error.unwrap_or_default(),
            }),
            ApiStatus::Success => match envelope.data {
                Some(result) => Ok(QueryResponse {
                    result,
                    warnings: envelope.warnings,
                }),
                None => Err(MetricsError::Status {
                    status: status.as_u16(),
                    body,
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const VECTOR_BODY: &str = r#"{
        "status": "success",
        "data": {
            "resultType": "vector",
            "result": [
                {"metric": {"pod": "web-6f7d9c9fb6-x2kvp", "container": "web"}, "value": [1700000000.0, "90.5"]}
            ]
        },
        "warnings": ["query touched many series"]
    }"#;

    fn client_for(server: &mockito::Server) -> PrometheusClient {
        PrometheusClient::new(&PrometheusConfig {
            endpoint: server.url(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_query_url_keeps_path_prefix() {
        let client = PrometheusClient::new(&PrometheusConfig {
            endpoint: "http://thanos:9090/prom".to_string(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        assert_eq!(
            client.query_url().as_str(),
            "http://thanos:9090/prom/api/v1/query"
        );
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        let result = PrometheusClient::new(&PrometheusConfig {
            endpoint: "not a url".to_string(),
            timeout: Duration::from_secs(1),
        });
        assert!(matches!(result, Err(MetricsError::InvalidEndpoint { .. })));
    }

    #[test]
    fn test_decode_non_vector_results() {
        let matrix: QueryResult = serde_json::from_str(
            r#"{"resultType": "matrix", "result": [{"metric": {"container": "a"}, "values": [[1.0, "2"]]}]}"#,
        )
        .unwrap();
        assert_eq!(matrix.kind(), "matrix");

        let scalar: QueryResult =
            serde_json::from_str(r#"{"resultType": "scalar", "result": [1.0, "3"]}"#).unwrap();
        assert_eq!(scalar, QueryResult::Scalar((1.0, "3".to_string())));
    }

    #[tokio::test]
    async fn test_instant_query_returns_vector_and_warnings() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/query")
            .match_query(Matcher::UrlEncoded(
                "query".into(),
                "up{job=\"node\"}".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(VECTOR_BODY)
            .create_async()
            .await;

        let response = client_for(&server)
            .instant_query("up{job=\"node\"}", Utc::now())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.warnings, vec!["query touched many series"]);
        match response.result {
            QueryResult::Vector(samples) => {
                assert_eq!(samples.len(), 1);
                assert_eq!(samples[0].metric["container"], "web");
                assert_eq!(samples[0].value.1, "90.5");
            }
            other => panic!("expected vector, got {}", other.kind()),
        }
    }

    #[tokio::test]
    async fn test_instant_query_maps_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/query")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"status": "error", "errorType": "bad_data", "error": "parse error"}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .instant_query("sum(", Utc::now())
            .await
            .unwrap_err();

        match err {
            MetricsError::Api { error_type, error } => {
                assert_eq!(error_type, "bad_data");
                assert_eq!(error, "parse error");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_instant_query_maps_plain_http_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/query")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("service unavailable")
            .create_async()
            .await;

        let err = client_for(&server)
            .instant_query("up", Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(err, MetricsError::Status { status: 503, .. }));
    }
}
