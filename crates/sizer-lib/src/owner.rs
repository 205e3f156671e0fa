//! Maps a pod's owner reference to the workload name used in queries

use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;

/// Workload name for an owner reference.
///
/// DaemonSets and StatefulSets own their pods directly, so their name is the
/// workload name. For ReplicaSets (and any other kind) the trailing
/// `-<pod-template-hash>` segment is stripped to recover the Deployment.
pub fn workload_name(owner: &OwnerReference) -> String {
    match owner.kind.as_str() {
        "DaemonSet" | "StatefulSet" => owner.name.clone(),
        _ => controller_name(&owner.name).to_string(),
    }
}

/// Drop the last hyphen-delimited segment of `owner_name`.
///
/// Names without a hyphen have no hash suffix and are returned unchanged.
pub fn controller_name(owner_name: &str) -> &str {
    owner_name
        .rsplit_once('-')
        .map(|(controller, _)| controller)
        .unwrap_or(owner_name)
}

/// The pod's first owner reference, if it has any
pub fn primary_owner(pod: &Pod) -> Option<&OwnerReference> {
    pod.metadata.owner_references.as_ref()?.first()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(kind: &str, name: &str) -> OwnerReference {
        OwnerReference {
            api_version: "apps/v1".to_string(),
            kind: kind.to_string(),
            name: name.to_string(),
            uid: "b7c1a6d2-0000-4000-8000-000000000000".to_string(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        }
    }

    #[test]
    fn test_replicaset_strips_template_hash() {
        assert_eq!(workload_name(&owner("ReplicaSet", "web-6f7d9c9fb6")), "web");
        assert_eq!(
            workload_name(&owner("ReplicaSet", "payment-api-5d8c7b9f44")),
            "payment-api"
        );
    }

    #[test]
    fn test_statefulset_and_daemonset_names_unchanged() {
        assert_eq!(workload_name(&owner("StatefulSet", "cache")), "cache");
        assert_eq!(workload_name(&owner("DaemonSet", "node-exporter")), "node-exporter");
    }

    #[test]
    fn test_other_kinds_strip_last_segment() {
        assert_eq!(workload_name(&owner("Job", "backup-28391520")), "backup");
    }

    #[test]
    fn test_name_without_hyphen_is_kept() {
        assert_eq!(controller_name("standalone"), "standalone");
    }

    #[test]
    fn test_primary_owner() {
        let mut pod = Pod::default();
        assert!(primary_owner(&pod).is_none());

        pod.metadata.owner_references = Some(vec![]);
        assert!(primary_owner(&pod).is_none());

        pod.metadata.owner_references = Some(vec![
            owner("ReplicaSet", "web-6f7d9c9fb6"),
            owner("StatefulSet", "other"),
        ]);
        assert_eq!(primary_owner(&pod).unwrap().name, "web-6f7d9c9fb6");
    }
}
