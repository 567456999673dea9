// Conversion from Kubernetes API objects to snapshot records.

use crate::models::{
    ConfigMapInfo, ContainerState, ContainerStatusInfo, DeploymentCondition, IngressInfo,
    IngressPath, IngressTls, NodeInfo, PersistentVolumeClaimInfo, PersistentVolumeInfo, PodInfo,
    SecretInfo, ServiceInfo, ServicePort, WorkloadInfo,
};
use chrono::{DateTime, Utc};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{
    ConfigMap, Container, ContainerStatus, Node, NodeCondition, ObjectReference,
    PersistentVolume, PersistentVolumeClaim, PersistentVolumeSpec, Pod, Secret, Service,
};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference, Time};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;

const POD_TEMPLATE_HASH_LABEL: &str = "pod-template-hash";

fn time(t: &Option<Time>) -> Option<DateTime<Utc>> {
    t.as_ref().map(|t| t.0)
}

fn name(meta: &ObjectMeta) -> String {
    meta.name.clone().unwrap_or_default()
}

fn namespace(meta: &ObjectMeta) -> String {
    meta.namespace.clone().unwrap_or_default()
}

fn labels(meta: &ObjectMeta) -> BTreeMap<String, String> {
    meta.labels.clone().unwrap_or_default()
}

fn annotations(meta: &ObjectMeta) -> BTreeMap<String, String> {
    meta.annotations.clone().unwrap_or_default()
}

fn quantity(map: Option<&BTreeMap<String, Quantity>>, resource: &str) -> String {
    map.and_then(|m| m.get(resource))
        .map(|q| q.0.clone())
        .unwrap_or_default()
}

/// Request and limit strings for `resource` across the pod's containers.
/// When several containers declare it, the last one wins.
pub fn resource_strings(containers: &[Container], resource: &str) -> (String, String) {
    let mut request = String::new();
    let mut limit = String::new();
    for c in containers {
        let Some(res) = &c.resources else { continue };
        if let Some(q) = res.requests.as_ref().and_then(|m| m.get(resource)) {
            request = q.0.clone();
        }
        if let Some(q) = res.limits.as_ref().and_then(|m| m.get(resource)) {
            limit = q.0.clone();
        }
    }
    (request, limit)
}

pub fn container_state(status: &ContainerStatus) -> ContainerState {
    match &status.state {
        Some(s) if s.running.is_some() => ContainerState::Running,
        Some(s) if s.waiting.is_some() => ContainerState::Waiting,
        Some(s) if s.terminated.is_some() => ContainerState::Terminated,
        _ => ContainerState::Unknown,
    }
}

/// True only when a `Ready` condition reports status `True`.
pub fn node_ready(conditions: &[NodeCondition]) -> bool {
    conditions
        .iter()
        .any(|c| c.type_ == "Ready" && c.status == "True")
}

/// Deployment owning a pod, via its first ReplicaSet owner reference.
///
/// ReplicaSets created by a Deployment are named `<deployment>-<pod-template-hash>`;
/// the suffix is stripped when the pod's hash label confirms it. Empty when no
/// ReplicaSet owns the pod.
pub fn owning_workload(
    owner_refs: &[OwnerReference],
    labels: &BTreeMap<String, String>,
) -> String {
    let Some(rs) = owner_refs.iter().find(|r| r.kind == "ReplicaSet") else {
        return String::new();
    };
    if let Some(hash) = labels.get(POD_TEMPLATE_HASH_LABEL).filter(|h| !h.is_empty()) {
        if let Some(base) = rs.name.strip_suffix(hash.as_str()).and_then(|s| s.strip_suffix('-')) {
            if !base.is_empty() {
                return base.to_string();
            }
        }
    }
    rs.name.clone()
}

pub fn volume_source(spec: &PersistentVolumeSpec) -> &'static str {
    if spec.host_path.is_some() {
        "hostPath"
    } else if spec.nfs.is_some() {
        "nfs"
    } else if spec.csi.is_some() {
        "csi"
    } else if spec.local.is_some() {
        "local"
    } else if spec.aws_elastic_block_store.is_some() {
        "awsElasticBlockStore"
    } else if spec.gce_persistent_disk.is_some() {
        "gcePersistentDisk"
    } else {
        "other"
    }
}

/// `namespace/name` of the bound claim.
pub fn claim_ref(r: &ObjectReference) -> String {
    format!(
        "{}/{}",
        r.namespace.as_deref().unwrap_or_default(),
        r.name.as_deref().unwrap_or_default()
    )
}

/// Key names of a secret, sorted. Values are never read.
pub fn secret_data_keys(secret: &Secret) -> Vec<String> {
    let mut keys: Vec<String> = secret
        .data
        .iter()
        .flat_map(|m| m.keys())
        .chain(secret.string_data.iter().flat_map(|m| m.keys()))
        .cloned()
        .collect();
    keys.sort();
    keys.dedup();
    keys
}

pub fn workload_info(d: &Deployment) -> WorkloadInfo {
    let status = d.status.as_ref();
    WorkloadInfo {
        name: name(&d.metadata),
        namespace: namespace(&d.metadata),
        created_time: time(&d.metadata.creation_timestamp),
        replicas: d.spec.as_ref().and_then(|s| s.replicas).unwrap_or(0),
        ready_replicas: status.and_then(|s| s.ready_replicas).unwrap_or(0),
        updated_replicas: status.and_then(|s| s.updated_replicas).unwrap_or(0),
        conditions: status
            .and_then(|s| s.conditions.as_ref())
            .map(|cs| {
                cs.iter()
                    .map(|c| DeploymentCondition {
                        type_: c.type_.clone(),
                        status: c.status.clone(),
                        reason: c.reason.clone().unwrap_or_default(),
                        message: c.message.clone().unwrap_or_default(),
                        last_update_time: time(&c.last_update_time),
                        last_transition_time: time(&c.last_transition_time),
                    })
                    .collect()
            })
            .unwrap_or_default(),
        labels: labels(&d.metadata),
        annotations: annotations(&d.metadata),
    }
}

pub fn pod_info(p: &Pod) -> PodInfo {
    let containers = p.spec.as_ref().map(|s| s.containers.as_slice()).unwrap_or_default();
    let (cpu_request, cpu_limit) = resource_strings(containers, "cpu");
    let (memory_request, memory_limit) = resource_strings(containers, "memory");
    let (storage_request, _) = resource_strings(containers, "storage");

    let status = p.status.as_ref();
    let container_statuses: Vec<ContainerStatusInfo> = status
        .and_then(|s| s.container_statuses.as_ref())
        .map(|cs| {
            cs.iter()
                .map(|c| ContainerStatusInfo {
                    name: c.name.clone(),
                    ready: c.ready,
                    restart_count: c.restart_count,
                    image: c.image.clone(),
                    state: container_state(c),
                })
                .collect()
        })
        .unwrap_or_default();

    let pod_labels = labels(&p.metadata);
    PodInfo {
        name: name(&p.metadata),
        namespace: namespace(&p.metadata),
        deployment_name: owning_workload(
            p.metadata.owner_references.as_deref().unwrap_or_default(),
            &pod_labels,
        ),
        created_time: time(&p.metadata.creation_timestamp),
        phase: status.and_then(|s| s.phase.clone()).unwrap_or_default(),
        node_name: p.spec.as_ref().and_then(|s| s.node_name.clone()).unwrap_or_default(),
        pod_ip: status.and_then(|s| s.pod_ip.clone()).unwrap_or_default(),
        host_ip: status.and_then(|s| s.host_ip.clone()).unwrap_or_default(),
        restart_count: container_statuses.iter().map(|c| c.restart_count).sum(),
        cpu_request,
        cpu_limit,
        memory_request,
        memory_limit,
        storage_request,
        labels: pod_labels,
        annotations: annotations(&p.metadata),
        container_statuses,
    }
}

pub fn node_info(n: &Node) -> NodeInfo {
    let status = n.status.as_ref();
    let capacity = status.and_then(|s| s.capacity.as_ref());
    let allocatable = status.and_then(|s| s.allocatable.as_ref());
    let sys = status.and_then(|s| s.node_info.as_ref());
    NodeInfo {
        name: name(&n.metadata),
        created_time: time(&n.metadata.creation_timestamp),
        ready: node_ready(
            status
                .and_then(|s| s.conditions.as_deref())
                .unwrap_or_default(),
        ),
        cpu_capacity: quantity(capacity, "cpu"),
        memory_capacity: quantity(capacity, "memory"),
        storage_capacity: quantity(capacity, "storage"),
        cpu_allocatable: quantity(allocatable, "cpu"),
        memory_allocatable: quantity(allocatable, "memory"),
        storage_allocatable: quantity(allocatable, "storage"),
        os_image: sys.map(|i| i.os_image.clone()).unwrap_or_default(),
        kernel_version: sys.map(|i| i.kernel_version.clone()).unwrap_or_default(),
        kubelet_version: sys.map(|i| i.kubelet_version.clone()).unwrap_or_default(),
        labels: labels(&n.metadata),
        annotations: annotations(&n.metadata),
    }
}

fn target_port(p: &Option<IntOrString>) -> String {
    match p {
        Some(IntOrString::Int(n)) => n.to_string(),
        Some(IntOrString::String(s)) => s.clone(),
        None => String::new(),
    }
}

pub fn service_info(s: &Service) -> ServiceInfo {
    let spec = s.spec.as_ref();
    ServiceInfo {
        name: name(&s.metadata),
        namespace: namespace(&s.metadata),
        created_time: time(&s.metadata.creation_timestamp),
        type_: spec.and_then(|s| s.type_.clone()).unwrap_or_default(),
        cluster_ip: spec.and_then(|s| s.cluster_ip.clone()).unwrap_or_default(),
        external_ips: spec.and_then(|s| s.external_ips.clone()).unwrap_or_default(),
        ports: spec
            .and_then(|s| s.ports.as_ref())
            .map(|ports| {
                ports
                    .iter()
                    .map(|p| ServicePort {
                        name: p.name.clone().unwrap_or_default(),
                        protocol: p.protocol.clone().unwrap_or_default(),
                        port: p.port,
                        target_port: target_port(&p.target_port),
                        node_port: p.node_port,
                    })
                    .collect()
            })
            .unwrap_or_default(),
        selector: spec.and_then(|s| s.selector.clone()).unwrap_or_default(),
        labels: labels(&s.metadata),
        annotations: annotations(&s.metadata),
    }
}

pub fn ingress_info(i: &Ingress) -> IngressInfo {
    let spec = i.spec.as_ref();
    let rules = spec.and_then(|s| s.rules.as_deref()).unwrap_or_default();

    let hosts = rules
        .iter()
        .filter_map(|r| r.host.clone())
        .filter(|h| !h.is_empty())
        .collect();

    let paths = rules
        .iter()
        .filter_map(|r| r.http.as_ref())
        .flat_map(|http| http.paths.iter())
        .map(|p| {
            let backend = p.backend.service.as_ref();
            IngressPath {
                path: p.path.clone().unwrap_or_default(),
                path_type: p.path_type.clone(),
                service_name: backend.map(|b| b.name.clone()).unwrap_or_default(),
                service_port: backend
                    .and_then(|b| b.port.as_ref())
                    .and_then(|port| port.number)
                    .unwrap_or(0),
            }
        })
        .collect();

    let tls = spec
        .and_then(|s| s.tls.as_ref())
        .map(|tls| {
            tls.iter()
                .map(|t| IngressTls {
                    hosts: t.hosts.clone().unwrap_or_default(),
                    secret_name: t.secret_name.clone().unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default();

    IngressInfo {
        name: name(&i.metadata),
        namespace: namespace(&i.metadata),
        created_time: time(&i.metadata.creation_timestamp),
        hosts,
        paths,
        tls,
        labels: labels(&i.metadata),
        annotations: annotations(&i.metadata),
    }
}

pub fn config_map_info(cm: &ConfigMap) -> ConfigMapInfo {
    ConfigMapInfo {
        name: name(&cm.metadata),
        namespace: namespace(&cm.metadata),
        created_time: time(&cm.metadata.creation_timestamp),
        data: cm.data.clone().unwrap_or_default(),
        binary_data: cm
            .binary_data
            .as_ref()
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.0.clone())).collect())
            .unwrap_or_default(),
        labels: labels(&cm.metadata),
        annotations: annotations(&cm.metadata),
    }
}

pub fn secret_info(s: &Secret) -> SecretInfo {
    SecretInfo {
        name: name(&s.metadata),
        namespace: namespace(&s.metadata),
        created_time: time(&s.metadata.creation_timestamp),
        type_: s.type_.clone().unwrap_or_default(),
        data_keys: secret_data_keys(s),
        labels: labels(&s.metadata),
        annotations: annotations(&s.metadata),
    }
}

pub fn persistent_volume_info(pv: &PersistentVolume) -> PersistentVolumeInfo {
    let spec = pv.spec.as_ref();
    PersistentVolumeInfo {
        name: name(&pv.metadata),
        created_time: time(&pv.metadata.creation_timestamp),
        capacity: quantity(spec.and_then(|s| s.capacity.as_ref()), "storage"),
        access_modes: spec.and_then(|s| s.access_modes.clone()).unwrap_or_default(),
        reclaim_policy: spec
            .and_then(|s| s.persistent_volume_reclaim_policy.clone())
            .unwrap_or_default(),
        storage_class: spec.and_then(|s| s.storage_class_name.clone()).unwrap_or_default(),
        volume_mode: spec.and_then(|s| s.volume_mode.clone()).unwrap_or_default(),
        status: pv
            .status
            .as_ref()
            .and_then(|s| s.phase.clone())
            .unwrap_or_default(),
        claim_ref: spec
            .and_then(|s| s.claim_ref.as_ref())
            .map(claim_ref)
            .unwrap_or_default(),
        volume_source: spec.map(volume_source).unwrap_or("other").to_string(),
        labels: labels(&pv.metadata),
        annotations: annotations(&pv.metadata),
    }
}

pub fn persistent_volume_claim_info(pvc: &PersistentVolumeClaim) -> PersistentVolumeClaimInfo {
    let spec = pvc.spec.as_ref();
    PersistentVolumeClaimInfo {
        name: name(&pvc.metadata),
        namespace: namespace(&pvc.metadata),
        created_time: time(&pvc.metadata.creation_timestamp),
        requested_size: quantity(
            spec.and_then(|s| s.resources.as_ref())
                .and_then(|r| r.requests.as_ref()),
            "storage",
        ),
        access_modes: spec.and_then(|s| s.access_modes.clone()).unwrap_or_default(),
        storage_class: spec.and_then(|s| s.storage_class_name.clone()).unwrap_or_default(),
        volume_mode: spec.and_then(|s| s.volume_mode.clone()).unwrap_or_default(),
        status: pvc
            .status
            .as_ref()
            .and_then(|s| s.phase.clone())
            .unwrap_or_default(),
        volume_name: spec.and_then(|s| s.volume_name.clone()).unwrap_or_default(),
        labels: labels(&pvc.metadata),
        annotations: annotations(&pvc.metadata),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::ByteString;
    use k8s_openapi::api::core::v1::{
        ContainerState as K8sContainerState, ContainerStateRunning, ContainerStateWaiting,
        HostPathVolumeSource, NFSVolumeSource, ResourceRequirements,
    };

    fn container(requests: &[(&str, &str)], limits: &[(&str, &str)]) -> Container {
        let map = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), Quantity(v.to_string())))
                .collect::<BTreeMap<_, _>>()
        };
        Container {
            name: "app".into(),
            resources: Some(ResourceRequirements {
                requests: Some(map(requests)),
                limits: Some(map(limits)),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn owner(kind: &str, name: &str) -> OwnerReference {
        OwnerReference {
            kind: kind.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    #[test]
    fn last_container_wins_for_resources() {
        let containers = vec![
            container(&[("cpu", "100m")], &[("cpu", "200m")]),
            container(&[("cpu", "250m"), ("memory", "64Mi")], &[]),
        ];
        assert_eq!(
            resource_strings(&containers, "cpu"),
            ("250m".to_string(), "200m".to_string())
        );
        assert_eq!(
            resource_strings(&containers, "memory"),
            ("64Mi".to_string(), String::new())
        );
        assert_eq!(resource_strings(&[], "cpu"), (String::new(), String::new()));
    }

    #[test]
    fn container_state_prefers_running_then_waiting() {
        let mut status = ContainerStatus {
            state: Some(K8sContainerState {
                running: Some(ContainerStateRunning::default()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(container_state(&status), ContainerState::Running);

        status.state = Some(K8sContainerState {
            waiting: Some(ContainerStateWaiting::default()),
            ..Default::default()
        });
        assert_eq!(container_state(&status), ContainerState::Waiting);

        status.state = None;
        assert_eq!(container_state(&status), ContainerState::Unknown);
    }

    #[test]
    fn node_ready_requires_true_ready_condition() {
        let cond = |t: &str, s: &str| NodeCondition {
            type_: t.into(),
            status: s.into(),
            ..Default::default()
        };
        assert!(node_ready(&[cond("MemoryPressure", "False"), cond("Ready", "True")]));
        assert!(!node_ready(&[cond("Ready", "False")]));
        assert!(!node_ready(&[cond("Ready", "Unknown")]));
        assert!(!node_ready(&[]));
    }

    #[test]
    fn owning_workload_strips_template_hash() {
        let mut labels = BTreeMap::new();
        labels.insert(POD_TEMPLATE_HASH_LABEL.to_string(), "7d9f8c6b5".to_string());
        let refs = vec![owner("ReplicaSet", "web-7d9f8c6b5")];
        assert_eq!(owning_workload(&refs, &labels), "web");

        // hash label does not match the suffix: keep the ReplicaSet name
        labels.insert(POD_TEMPLATE_HASH_LABEL.to_string(), "other".to_string());
        assert_eq!(owning_workload(&refs, &labels), "web-7d9f8c6b5");
    }

    #[test]
    fn owning_workload_uses_first_replica_set_only() {
        let refs = vec![
            owner("StatefulSet", "db"),
            owner("ReplicaSet", "api-abc"),
            owner("ReplicaSet", "api-def"),
        ];
        assert_eq!(owning_workload(&refs, &BTreeMap::new()), "api-abc");
        assert_eq!(owning_workload(&[owner("DaemonSet", "agent")], &BTreeMap::new()), "");
        assert_eq!(owning_workload(&[], &BTreeMap::new()), "");
    }

    #[test]
    fn volume_source_names() {
        let mut spec = PersistentVolumeSpec {
            host_path: Some(HostPathVolumeSource {
                path: "/data".into(),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(volume_source(&spec), "hostPath");

        spec.host_path = None;
        spec.nfs = Some(NFSVolumeSource {
            server: "nas".into(),
            path: "/export".into(),
            ..Default::default()
        });
        assert_eq!(volume_source(&spec), "nfs");

        assert_eq!(volume_source(&PersistentVolumeSpec::default()), "other");
    }

    #[test]
    fn claim_ref_is_namespace_slash_name() {
        let r = ObjectReference {
            namespace: Some("prod".into()),
            name: Some("data-db-0".into()),
            ..Default::default()
        };
        assert_eq!(claim_ref(&r), "prod/data-db-0");
    }

    #[test]
    fn secret_info_keeps_key_names_only() {
        let mut data = BTreeMap::new();
        data.insert("password".to_string(), ByteString(b"hunter2".to_vec()));
        data.insert("username".to_string(), ByteString(b"admin".to_vec()));
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some("db-creds".into()),
                namespace: Some("prod".into()),
                ..Default::default()
            },
            data: Some(data),
            type_: Some("Opaque".into()),
            ..Default::default()
        };

        let info = secret_info(&secret);
        assert_eq!(info.data_keys, vec!["password", "username"]);
        assert_eq!(info.type_, "Opaque");

        let json = serde_json::to_string(&info).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(!json.contains("YWRtaW4"));
    }

    #[test]
    fn pod_info_sums_restarts_and_derives_fields() {
        let pod = Pod {
            metadata: ObjectMeta {
                name: Some("web-7d9f8c6b5-x2x4z".into()),
                namespace: Some("default".into()),
                labels: Some(BTreeMap::from([(
                    POD_TEMPLATE_HASH_LABEL.to_string(),
                    "7d9f8c6b5".to_string(),
                )])),
                owner_references: Some(vec![owner("ReplicaSet", "web-7d9f8c6b5")]),
                ..Default::default()
            },
            spec: Some(k8s_openapi::api::core::v1::PodSpec {
                containers: vec![container(&[("cpu", "100m"), ("memory", "128Mi")], &[("memory", "256Mi")])],
                node_name: Some("node-1".into()),
                ..Default::default()
            }),
            status: Some(k8s_openapi::api::core::v1::PodStatus {
                phase: Some("Running".into()),
                container_statuses: Some(vec![
                    ContainerStatus {
                        name: "app".into(),
                        restart_count: 2,
                        ..Default::default()
                    },
                    ContainerStatus {
                        name: "sidecar".into(),
                        restart_count: 3,
                        ..Default::default()
                    },
                ]),
                ..Default::default()
            }),
        };

        let info = pod_info(&pod);
        assert_eq!(info.deployment_name, "web");
        assert_eq!(info.restart_count, 5);
        assert_eq!(info.cpu_request, "100m");
        assert_eq!(info.memory_limit, "256Mi");
        assert_eq!(info.node_name, "node-1");
        assert_eq!(info.phase, "Running");
        assert_eq!(info.container_statuses.len(), 2);
        assert_eq!(info.container_statuses[0].state, ContainerState::Unknown);
    }

    #[test]
    fn storage_fields_read_the_storage_resource() {
        let pod = Pod {
            spec: Some(k8s_openapi::api::core::v1::PodSpec {
                containers: vec![container(
                    &[("storage", "5Gi"), ("ephemeral-storage", "1Gi")],
                    &[],
                )],
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(pod_info(&pod).storage_request, "5Gi");

        let quantities = |v: &str| {
            BTreeMap::from([
                ("storage".to_string(), Quantity(v.into())),
                ("ephemeral-storage".to_string(), Quantity("1Gi".into())),
            ])
        };
        let node = Node {
            status: Some(k8s_openapi::api::core::v1::NodeStatus {
                capacity: Some(quantities("100Gi")),
                allocatable: Some(quantities("90Gi")),
                ..Default::default()
            }),
            ..Default::default()
        };
        let info = node_info(&node);
        assert_eq!(info.storage_capacity, "100Gi");
        assert_eq!(info.storage_allocatable, "90Gi");
    }
}
