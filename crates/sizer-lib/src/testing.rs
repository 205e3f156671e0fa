//! In-memory metrics store used by unit tests

use crate::error::MetricsError;
use crate::metrics::{InstantSample, MetricsStore, QueryResponse, QueryResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// Canned answer for one query
#[derive(Debug, Clone)]
pub enum FakeReply {
    /// Instant vector of `(container, value)` samples
    Vector(Vec<(String, String)>),
    /// Instant vector returned together with a warning
    Warned(Vec<(String, String)>),
    /// Scalar result, which the reducer rejects
    Scalar,
    /// Store unreachable
    Fail,
}

impl FakeReply {
    pub fn vector(samples: &[(&str, &str)]) -> Self {
        FakeReply::Vector(
            samples
                .iter()
                .map(|(c, v)| (c.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn into_response(self) -> Result<QueryResponse, MetricsError> {
        let to_vector = |samples: Vec<(String, String)>| {
            QueryResult::Vector(
                samples
                    .into_iter()
                    .map(|(container, value)| InstantSample {
                        metric: BTreeMap::from([("container".to_string(), container)]),
                        value: (1_700_000_000.0, value),
                    })
                    .collect(),
            )
        };

        match self {
            FakeReply::Vector(samples) => Ok(QueryResponse {
                result: to_vector(samples),
                warnings: Vec::new(),
            }),
            FakeReply::Warned(samples) => Ok(QueryResponse {
                result: to_vector(samples),
                warnings: vec!["query touched many series".to_string()],
            }),
            FakeReply::Scalar => Ok(QueryResponse {
                result: QueryResult::Scalar((1_700_000_000.0, "1".to_string())),
                warnings: Vec::new(),
            }),
            FakeReply::Fail => Err(MetricsError::Status {
                status: 503,
                body: "unavailable".to_string(),
            }),
        }
    }
}

/// Metrics store answering from a query → reply table
#[derive(Debug, Default)]
pub struct FakeStore {
    replies: HashMap<String, FakeReply>,
    default: Option<FakeReply>,
    queried: Mutex<Vec<String>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, query: &str, reply: FakeReply) -> Self {
        self.replies.insert(query.to_string(), reply);
        self
    }

    /// Reply for any query not registered with `with`; unknown queries fail otherwise
    pub fn with_default(mut self, reply: FakeReply) -> Self {
        self.default = Some(reply);
        self
    }

    pub fn was_queried(&self, query: &str) -> bool {
        self.queried
            .lock()
            .map(|queried| queried.iter().any(|q| q == query))
            .unwrap_or(false)
    }
}

#[async_trait]
impl MetricsStore for FakeStore {
    async fn instant_query(
        &self,
        query: &str,
        _at: DateTime<Utc>,
    ) -> Result<QueryResponse, MetricsError> {
        if let Ok(mut queried) = self.queried.lock() {
            queried.push(query.to_string());
        }

        self.replies
            .get(query)
            .or(self.default.as_ref())
            .cloned()
            .unwrap_or(FakeReply::Fail)
            .into_response()
    }
}
