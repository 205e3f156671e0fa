//! Observability infrastructure for the resource sizer
//!
//! Provides:
//! - Prometheus metrics (admission outcomes, metrics store latency and errors)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Histogram buckets for metrics store latency (in seconds)
const QUERY_LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Log `source` for admission handling events
pub const SOURCE_WEBHOOK: &str = "Webhook";

/// Log `source` for metrics store events
pub const SOURCE_METRICS: &str = "MetricsCollector";

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<SizerMetricsInner> = OnceLock::new();

struct SizerMetricsInner {
    admission_requests: IntCounterVec,
    query_latency_seconds: Histogram,
    query_errors: IntCounterVec,
    values_rewritten: IntCounter,
}

impl SizerMetricsInner {
    fn new() -> Self {
        Self {
            admission_requests: register_int_counter_vec!(
                "resource_sizer_admission_requests_total",
                "Admission requests handled, by outcome",
                &["outcome"]
            )
            .expect("Failed to register admission_requests_total"),

            query_latency_seconds: register_histogram!(
                "resource_sizer_metrics_query_latency_seconds",
                "Time spent executing instant queries against the metrics store",
                QUERY_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register metrics_query_latency_seconds"),

            query_errors: register_int_counter_vec!(
                "resource_sizer_metrics_query_errors_total",
                "Query pairs that failed and fell back to existing resources, by dimension",
                &["dimension"]
            )
            .expect("Failed to register metrics_query_errors_total"),

            values_rewritten: register_int_counter!(
                "resource_sizer_container_values_rewritten_total",
                "Container request/limit values replaced with usage-derived quantities"
            )
            .expect("Failed to register container_values_rewritten_total"),
        }
    }
}

/// Sizer metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the same
/// underlying metrics.
#[derive(Clone)]
pub struct SizerMetrics {
    _private: (),
}

impl Default for SizerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SizerMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(SizerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &SizerMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Count an admission by outcome (`allowed`, `patched`, `rejected`)
    pub fn inc_admission(&self, outcome: &str) {
        self.inner()
            .admission_requests
            .with_label_values(&[outcome])
            .inc();
    }

    /// Record a metrics store query latency observation
    pub fn observe_query_latency(&self, duration_secs: f64) {
        self.inner().query_latency_seconds.observe(duration_secs);
    }

    /// Count a failed query pair for a dimension (`cpu`, `memory`)
    pub fn inc_query_errors(&self, dimension: &str) {
        self.inner().query_errors.with_label_values(&[dimension]).inc();
    }

    /// Count container values rewritten from usage data
    pub fn add_values_rewritten(&self, count: u64) {
        self.inner().values_rewritten.inc_by(count);
    }
}

/// Structured logger for sizer events
///
/// Every event carries an `event` name and the `source` component that
/// emitted it. Handles are cheap to clone and are passed into components.
#[derive(Clone, Debug)]
pub struct StructuredLogger {
    source: &'static str,
}

impl StructuredLogger {
    pub fn new(source: &'static str) -> Self {
        Self { source }
    }

    /// Logger for admission handling
    pub fn webhook() -> Self {
        Self::new(SOURCE_WEBHOOK)
    }

    /// Logger for metrics store access
    pub fn metrics() -> Self {
        Self::new(SOURCE_METRICS)
    }

    pub fn source(&self) -> &'static str {
        self.source
    }

    /// Log a pod admitted without mutation
    pub fn log_admission_allowed(&self, pod: &str, namespace: &str, reason: &str) {
        info!(
            event = "AdmissionAllowed",
            source = %self.source,
            pod = %pod,
            namespace = %namespace,
            reason = %reason,
            "Pod admitted without resource changes"
        );
    }

    /// Log a rejected admission
    pub fn log_admission_error(&self, pod: &str, namespace: &str, code: u16, error: &str) {
        error!(
            event = "AdmissionError",
            source = %self.source,
            pod = %pod,
            namespace = %namespace,
            code = code,
            error = %error,
            "Admission request rejected"
        );
    }

    /// Log a pod without owner references
    pub fn log_missing_owner(&self, pod: &str, namespace: &str) {
        warn!(
            event = "PodOwnerReferences",
            source = %self.source,
            pod = %pod,
            namespace = %namespace,
            "Pod has no owner references, it is orphaned or has no owners"
        );
    }

    /// Log the start of resizing for a resolved workload
    pub fn log_resize_started(&self, workload: &str, owner_kind: &str, namespace: &str) {
        info!(
            event = "AdmissionAllowed",
            source = %self.source,
            workload = %workload,
            owner_kind = %owner_kind,
            namespace = %namespace,
            "Opt-in confirmed, resizing pod under owner reference"
        );
    }

    /// Log a container's final resource values
    pub fn log_container_update(
        &self,
        container: &str,
        workload: &str,
        namespace: &str,
        cpu_request: Option<&str>,
        memory_request: Option<&str>,
        cpu_limit: Option<&str>,
        memory_limit: Option<&str>,
    ) {
        info!(
            event = "ContainerAllocationUpdate",
            source = %self.source,
            container = %container,
            workload = %workload,
            namespace = %namespace,
            cpu_request = ?cpu_request,
            memory_request = ?memory_request,
            cpu_limit = ?cpu_limit,
            memory_limit = ?memory_limit,
            "Container resources updated"
        );
    }

    /// Log the start of a metrics generation step for a dimension
    pub fn log_generation_started(&self, workload: &str, dimension: &str) {
        info!(
            event = "MetricsGeneration",
            source = %self.source,
            workload = %workload,
            dimension = %dimension,
            "Starting generation of metrics"
        );
    }

    /// Log warnings returned alongside a query result
    pub fn log_query_warnings(&self, workload: &str, query: &str, warnings: &[String]) {
        warn!(
            event = "MetricsCollectionWarn",
            source = %self.source,
            workload = %workload,
            query = %query,
            warnings = ?warnings,
            "Metrics store returned warnings"
        );
    }

    /// Log a query that matched no series
    pub fn log_empty_result(&self, workload: &str, query: &str) {
        info!(
            event = "MetricsCollectionEmpty",
            source = %self.source,
            workload = %workload,
            query = %query,
            "No metrics retrieved for workload"
        );
    }

    /// Log a failed query pair; the dimension falls back to existing values
    pub fn log_dimension_failure(&self, workload: &str, dimension: &str, error: &str) {
        error!(
            event = "MetricsPropagateError",
            source = %self.source,
            workload = %workload,
            dimension = %dimension,
            error = %error,
            "Metrics unavailable, keeping existing values for dimension"
        );
    }

    /// Log server startup
    pub fn log_startup(&self, version: &str, metrics_endpoint: &str) {
        info!(
            event = "SizerStarted",
            source = %self.source,
            version = %version,
            metrics_endpoint = %metrics_endpoint,
            "Resource sizer started"
        );
    }

    /// Log server shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "SizerShutdown",
            source = %self.source,
            reason = %reason,
            "Resource sizer shutting down"
        );
    }
}
