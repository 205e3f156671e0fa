//! Usage metrics from the time-series store
//!
//! This module builds the per-workload PromQL queries, executes them as
//! instant queries and reduces the returned vectors into per-container
//! values that size requests and limits.

mod aggregator;
pub mod client;
mod query;
mod reducer;

pub use aggregator::ResourceAggregator;
pub use client::{
    InstantSample, PrometheusClient, PrometheusConfig, QueryResponse, QueryResult, RangeSeries,
    SamplePoint,
};
pub use query::WorkloadQueries;
pub use reducer::{reduce_vector, CONTAINER_LABEL};

use crate::error::MetricsError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Trait for time-series stores that answer instant queries
#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// Evaluate `query` at the single point in time `at`
    async fn instant_query(
        &self,
        query: &str,
        at: DateTime<Utc>,
    ) -> Result<QueryResponse, MetricsError>;
}
