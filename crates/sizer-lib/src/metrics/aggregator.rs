//! Assembles a workload's resource allocation from the four usage queries

use super::{reduce_vector, MetricsStore, QueryResult};
use crate::error::MetricsError;
use crate::models::{ContainerUsage, ResourceAllocation};
use crate::observability::{SizerMetrics, StructuredLogger};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

/// Runs the CPU and memory query pairs for a workload.
///
/// Never fails: a pair whose base or peak query fails leaves both of its
/// maps at `None` so callers keep the pod's existing values for that
/// dimension. The CPU and memory pairs fail independently.
#[derive(Clone)]
pub struct ResourceAggregator {
    store: Arc<dyn MetricsStore>,
    logger: StructuredLogger,
    metrics: SizerMetrics,
}

impl ResourceAggregator {
    pub fn new(store: Arc<dyn MetricsStore>) -> Self {
        Self {
            store,
            logger: StructuredLogger::metrics(),
            metrics: SizerMetrics::new(),
        }
    }

    /// Use a specific logger handle
    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Build the allocation record for `workload`
    pub async fn aggregate(&self, workload: &str) -> ResourceAllocation {
        let mut allocation = ResourceAllocation::new(workload);

        self.logger.log_generation_started(workload, "cpu");
        match self
            .query_pair(workload, &allocation.queries.base_cpu, &allocation.queries.peak_cpu)
            .await
        {
            Ok((avg, peak)) => {
                allocation.avg_cpu = Some(avg);
                allocation.peak_cpu = Some(peak);
            }
            Err(err) => {
                self.metrics.inc_query_errors("cpu");
                self.logger
                    .log_dimension_failure(workload, "cpu", &err.to_string());
            }
        }

        self.logger.log_generation_started(workload, "memory");
        match self
            .query_pair(
                workload,
                &allocation.queries.base_memory,
                &allocation.queries.peak_memory,
            )
            .await
        {
            Ok((avg, peak)) => {
                allocation.avg_memory = Some(avg);
                allocation.peak_memory = Some(peak);
            }
            Err(err) => {
                self.metrics.inc_query_errors("memory");
                self.logger
                    .log_dimension_failure(workload, "memory", &err.to_string());
            }
        }

        allocation
    }

    /// Base query first; the peak query is skipped once the base has failed
    async fn query_pair(
        &self,
        workload: &str,
        base_query: &str,
        peak_query: &str,
    ) -> Result<(ContainerUsage, ContainerUsage), MetricsError> {
        let base = self.query_usage(workload, base_query).await?;
        let peak = self.query_usage(workload, peak_query).await?;
        Ok((base, peak))
    }

    async fn query_usage(&self, workload: &str, query: &str) -> Result<ContainerUsage, MetricsError> {
        let started = Instant::now();
        let response = self.store.instant_query(query, Utc::now()).await;
        self.metrics
            .observe_query_latency(started.elapsed().as_secs_f64());
        let response = response?;

        if !response.warnings.is_empty() {
            self.logger
                .log_query_warnings(workload, query, &response.warnings);
        }

        let usage = reduce_vector(&response.result)?;
        if matches!(&response.result, QueryResult::Vector(samples) if samples.is_empty()) {
            self.logger.log_empty_result(workload, query);
        }

        Ok(usage)
    }
}
