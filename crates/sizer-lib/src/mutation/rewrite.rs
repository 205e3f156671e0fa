//! Container resource rewrite from a workload's allocation

use super::quantity::{round_up, Resource};
use crate::models::{ContainerUsage, ResourceAllocation};
use k8s_openapi::api::core::v1::{Container, Pod};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::collections::BTreeMap;

/// Counts from one rewrite pass over a pod
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteSummary {
    pub containers: usize,
    pub values_rewritten: u64,
}

/// Rewrite every container of `pod` from `allocation`.
///
/// Requests come from the average maps and limits from the peak maps. Each of
/// the four values is looked up independently by container name; when the
/// map is missing or has no entry, the container's existing value is kept as
/// is (including being absent). Resource keys other than cpu and memory are
/// never touched.
pub fn rewrite_containers(pod: &mut Pod, allocation: &ResourceAllocation) -> RewriteSummary {
    let mut summary = RewriteSummary::default();
    let Some(spec) = pod.spec.as_mut() else {
        return summary;
    };

    for container in spec.containers.iter_mut() {
        summary.containers += 1;
        summary.values_rewritten += rewrite_container(container, allocation);
    }

    summary
}

fn rewrite_container(container: &mut Container, allocation: &ResourceAllocation) -> u64 {
    let had_resources = container.resources.is_some();
    let mut resources = container.resources.take().unwrap_or_default();
    let name = container.name.as_str();

    let rewritten = [
        apply(&mut resources.requests, Resource::Cpu, allocation.avg_cpu.as_ref(), name),
        apply(&mut resources.requests, Resource::Memory, allocation.avg_memory.as_ref(), name),
        apply(&mut resources.limits, Resource::Cpu, allocation.peak_cpu.as_ref(), name),
        apply(&mut resources.limits, Resource::Memory, allocation.peak_memory.as_ref(), name),
    ]
    .into_iter()
    .filter(|changed| *changed)
    .count() as u64;

    if had_resources || rewritten > 0 {
        container.resources = Some(resources);
    }
    rewritten
}

fn apply(
    list: &mut Option<BTreeMap<String, Quantity>>,
    resource: Resource,
    usage: Option<&ContainerUsage>,
    container: &str,
) -> bool {
    let Some(quantity) = usage
        .and_then(|usage| usage.get(container))
        .and_then(|value| round_up(*value, resource))
    else {
        return false;
    };

    list.get_or_insert_with(BTreeMap::new)
        .insert(resource.key().to_string(), quantity);
    true
}
