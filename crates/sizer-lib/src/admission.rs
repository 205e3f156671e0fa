//! Pod admission handling
//!
//! Drives a pod through the opt-in check, owner resolution, metrics fetch and
//! container rewrite, then turns the result into an admission response
//! carrying a JSON patch.

use crate::error::AdmissionError;
use crate::health::{HealthRegistry, StoreHealthTracker};
use crate::metrics::ResourceAggregator;
use crate::models::ResourceAllocation;
use crate::mutation::{rewrite_containers, AnnotationGate, GateDecision, Resource};
use crate::observability::{SizerMetrics, StructuredLogger};
use crate::owner;
use k8s_openapi::api::core::v1::{Container, Pod};
use kube::core::admission::{AdmissionRequest, AdmissionResponse};
use kube::core::DynamicObject;

/// Result of deciding on a decoded pod
#[derive(Debug, Clone, PartialEq)]
pub enum AdmissionDecision {
    /// Admit the pod as submitted
    Allowed { reason: String },
    /// Admit the pod with rewritten container resources
    Patched {
        workload: String,
        original: Box<Pod>,
        mutated: Box<Pod>,
    },
}

/// Mutating admission handler for pods
#[derive(Clone)]
pub struct PodMutator {
    aggregator: ResourceAggregator,
    gate: AnnotationGate,
    store_health: StoreHealthTracker,
    logger: StructuredLogger,
    metrics: SizerMetrics,
}

impl PodMutator {
    pub fn new(aggregator: ResourceAggregator, gate: AnnotationGate, health: HealthRegistry) -> Self {
        Self {
            aggregator,
            gate,
            store_health: StoreHealthTracker::new(health),
            logger: StructuredLogger::webhook(),
            metrics: SizerMetrics::new(),
        }
    }

    /// Report the metrics store degraded after `threshold` incomplete fetches in a row
    pub fn with_store_failure_threshold(mut self, threshold: u32) -> Self {
        self.store_health =
            StoreHealthTracker::with_threshold(self.store_health.registry().clone(), threshold);
        self
    }

    /// Use a specific logger handle
    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn gate(&self) -> &AnnotationGate {
        &self.gate
    }

    /// Answer an admission request for a pod
    pub async fn review(&self, request: &AdmissionRequest<DynamicObject>) -> AdmissionResponse {
        let namespace = request.namespace.as_deref().unwrap_or_default();
        let response = AdmissionResponse::from(request);

        match self.review_inner(request).await {
            Ok(ReviewOutcome::Allowed) => {
                self.metrics.inc_admission("allowed");
                response
            }
            Ok(ReviewOutcome::Patch(patch)) => match response.clone().with_patch(patch) {
                Ok(patched) => {
                    self.metrics.inc_admission("patched");
                    patched
                }
                Err(err) => self.errored(response, &request.name, namespace, err.into()),
            },
            Err(err) => self.errored(response, &request.name, namespace, err),
        }
    }

    async fn review_inner(
        &self,
        request: &AdmissionRequest<DynamicObject>,
    ) -> Result<ReviewOutcome, AdmissionError> {
        let object = request.object.as_ref().ok_or(AdmissionError::MissingObject)?;
        let pod = decode_pod(object)?;

        match self.decide(pod).await? {
            AdmissionDecision::Allowed { .. } => Ok(ReviewOutcome::Allowed),
            AdmissionDecision::Patched {
                original, mutated, ..
            } => {
                let before = serde_json::to_value(&original).map_err(AdmissionError::Serialization)?;
                let after = serde_json::to_value(&mutated).map_err(AdmissionError::Serialization)?;
                Ok(ReviewOutcome::Patch(json_patch::diff(&before, &after)))
            }
        }
    }

    /// Decide on a decoded pod
    pub async fn decide(&self, pod: Pod) -> Result<AdmissionDecision, AdmissionError> {
        let pod_name = pod_display_name(&pod);
        let namespace = pod.metadata.namespace.clone().unwrap_or_default();

        if let GateDecision::Skip(reason) = self.gate.check(&pod)? {
            self.logger
                .log_admission_allowed(&pod_name, &namespace, &reason);
            return Ok(AdmissionDecision::Allowed { reason });
        }

        let Some(owner) = owner::primary_owner(&pod) else {
            self.logger.log_missing_owner(&pod_name, &namespace);
            return Ok(AdmissionDecision::Allowed {
                reason: "pod has no owner references".to_string(),
            });
        };
        let workload = owner::workload_name(owner);
        self.logger
            .log_resize_started(&workload, &owner.kind, &namespace);

        let allocation = self.aggregator.aggregate(&workload).await;
        self.record_store_health(&allocation).await;

        let mut mutated = pod.clone();
        let summary = rewrite_containers(&mut mutated, &allocation);
        self.metrics.add_values_rewritten(summary.values_rewritten);

        if let Some(spec) = mutated.spec.as_ref() {
            for container in &spec.containers {
                self.log_container(container, &workload, &namespace);
            }
        }

        Ok(AdmissionDecision::Patched {
            workload,
            original: Box::new(pod),
            mutated: Box::new(mutated),
        })
    }

    async fn record_store_health(&self, allocation: &ResourceAllocation) {
        if allocation.has_cpu() && allocation.has_memory() {
            self.store_health.record_success().await;
        } else {
            self.store_health.record_failure(&allocation.name).await;
        }
    }

    fn log_container(&self, container: &Container, workload: &str, namespace: &str) {
        let resources = container.resources.as_ref();
        let lookup = |limits: bool, resource: Resource| {
            resources
                .and_then(|r| if limits { r.limits.as_ref() } else { r.requests.as_ref() })
                .and_then(|list| list.get(resource.key()))
                .map(|quantity| quantity.0.as_str())
        };

        self.logger.log_container_update(
            &container.name,
            workload,
            namespace,
            lookup(false, Resource::Cpu),
            lookup(false, Resource::Memory),
            lookup(true, Resource::Cpu),
            lookup(true, Resource::Memory),
        );
    }

    fn errored(
        &self,
        response: AdmissionResponse,
        name: &str,
        namespace: &str,
        err: AdmissionError,
    ) -> AdmissionResponse {
        let code = err.status_code();
        self.metrics.inc_admission("rejected");
        self.logger
            .log_admission_error(name, namespace, code, &err.to_string());

        let mut response = response.deny(err.to_string());
        response.result.code = code;
        response
    }
}

enum ReviewOutcome {
    Allowed,
    Patch(json_patch::Patch),
}

/// Decode the admission object into a typed pod
pub fn decode_pod(object: &DynamicObject) -> Result<Pod, AdmissionError> {
    let value = serde_json::to_value(object).map_err(AdmissionError::Decode)?;
    serde_json::from_value(value).map_err(AdmissionError::Decode)
}

fn pod_display_name(pod: &Pod) -> String {
    pod.metadata
        .name
        .clone()
        .or_else(|| pod.metadata.generate_name.clone())
        .unwrap_or_else(|| "<unknown>".to_string())
}
