//! Core data models for the resource sizer

use crate::metrics::WorkloadQueries;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Representative usage value per container name.
///
/// Millicores for CPU dimensions, mebibytes for memory dimensions.
pub type ContainerUsage = HashMap<String, f64>;

/// Usage-derived allocation for one workload, rebuilt on every admission.
///
/// Each map is `None` when its query pair failed and `Some` (possibly empty)
/// when the store answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceAllocation {
    pub name: String,
    pub avg_cpu: Option<ContainerUsage>,
    pub avg_memory: Option<ContainerUsage>,
    #[serde(rename = "peakCPU")]
    pub peak_cpu: Option<ContainerUsage>,
    pub peak_memory: Option<ContainerUsage>,
    #[serde(flatten)]
    pub queries: WorkloadQueries,
}

impl ResourceAllocation {
    /// Create an allocation with no metrics assigned yet
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let queries = WorkloadQueries::for_workload(&name);
        Self {
            name,
            avg_cpu: None,
            avg_memory: None,
            peak_cpu: None,
            peak_memory: None,
            queries,
        }
    }

    /// True when the CPU query pair succeeded
    pub fn has_cpu(&self) -> bool {
        self.avg_cpu.is_some() && self.peak_cpu.is_some()
    }

    /// True when the memory query pair succeeded
    pub fn has_memory(&self) -> bool {
        self.avg_memory.is_some() && self.peak_memory.is_some()
    }
}
