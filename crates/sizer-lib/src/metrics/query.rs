//! PromQL templates keyed by workload name

use serde::{Deserialize, Serialize};

/// The four instant queries used to size one workload.
///
/// Selectors match every pod whose name starts with `<workload>-`. CPU is
/// scaled to millicores, memory to megabytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadQueries {
    #[serde(rename = "baseCPUQuery")]
    pub base_cpu: String,
    #[serde(rename = "baseMemQuery")]
    pub base_memory: String,
    #[serde(rename = "peakCPUQuery")]
    pub peak_cpu: String,
    #[serde(rename = "peakMemQuery")]
    pub peak_memory: String,
}

impl WorkloadQueries {
    /// Build the queries for a workload. The name is inserted verbatim.
    pub fn for_workload(name: &str) -> Self {
        Self {
            base_cpu: format!(
                "sum(rate(container_cpu_usage_seconds_total{{pod=~\"{name}-.+\"}}[7d])) by (pod, container) * 1000"
            ),
            base_memory: format!(
                "avg(container_memory_working_set_bytes{{pod=~\"{name}-.+\"}}) by (pod, container) / 1000000"
            ),
            peak_cpu: format!(
                "max_over_time(rate(container_cpu_usage_seconds_total{{pod=~\"{name}-.+\"}}[1m])[168h:1m]) * 1000"
            ),
            peak_memory: format!(
                "max_over_time(container_memory_working_set_bytes{{pod=~\"{name}-.+\"}}[7d]) / 1000000"
            ),
        }
    }
}
