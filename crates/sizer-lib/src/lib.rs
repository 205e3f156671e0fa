//! Library for metrics-driven pod resource sizing
//!
//! This crate provides the core functionality for:
//! - Building and executing usage queries against a Prometheus-compatible store
//! - Reducing query results into per-container CPU and memory values
//! - Resolving a pod's owning workload
//! - Rewriting container requests/limits in a mutating admission webhook
//! - Health checks and observability

pub mod admission;
pub mod error;
pub mod health;
pub mod metrics;
pub mod models;
pub mod mutation;
pub mod observability;
pub mod owner;

#[cfg(test)]
mod testing;

pub use admission::{AdmissionDecision, PodMutator};
pub use error::{AdmissionError, MetricsError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
    StoreHealthTracker,
};
pub use metrics::{MetricsStore, PrometheusClient, PrometheusConfig, ResourceAggregator};
pub use models::*;
pub use mutation::AnnotationGate;
pub use observability::{SizerMetrics, StructuredLogger};
