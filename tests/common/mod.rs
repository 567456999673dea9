// Shared test helpers
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use cluster_snapshot::models::*;
use cluster_snapshot::store::SnapshotStore;
use std::collections::BTreeMap;
use tempfile::TempDir;

pub fn at_ms(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap()
}

pub async fn temp_store() -> (TempDir, SnapshotStore) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("snapshots.db");
    let store = SnapshotStore::connect(path.to_str().unwrap(), 2)
        .await
        .unwrap();
    store.init().await.unwrap();
    (dir, store)
}

fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Snapshot with every kind populated: 2 deployments, 3 pods (two namespaces),
/// 2 nodes, 1 service, 1 ingress, 2 configmaps, 1 secret, 1 PV, 1 PVC.
pub fn sample_snapshot(captured_at_ms: i64) -> Snapshot {
    let created = Some(at_ms(captured_at_ms - 60_000));
    Snapshot {
        timestamp: at_ms(captured_at_ms),
        deployments: vec![
            WorkloadInfo {
                name: "web".into(),
                namespace: "default".into(),
                created_time: created,
                replicas: 2,
                ready_replicas: 2,
                updated_replicas: 2,
                conditions: vec![DeploymentCondition {
                    type_: "Available".into(),
                    status: "True".into(),
                    reason: "MinimumReplicasAvailable".into(),
                    ..Default::default()
                }],
                labels: labels(&[("app", "web")]),
                ..Default::default()
            },
            WorkloadInfo {
                name: "metrics".into(),
                namespace: "monitoring".into(),
                created_time: created,
                replicas: 1,
                ready_replicas: 0,
                updated_replicas: 1,
                ..Default::default()
            },
        ],
        pods: vec![
            PodInfo {
                name: "web-7d9f8c6b5-a".into(),
                namespace: "default".into(),
                deployment_name: "web".into(),
                created_time: created,
                phase: "Running".into(),
                node_name: "node-1".into(),
                restart_count: 1,
                cpu_request: "100m".into(),
                memory_limit: "256Mi".into(),
                container_statuses: vec![ContainerStatusInfo {
                    name: "app".into(),
                    ready: true,
                    restart_count: 1,
                    image: "web:1.2".into(),
                    state: ContainerState::Running,
                }],
                ..Default::default()
            },
            PodInfo {
                name: "web-7d9f8c6b5-b".into(),
                namespace: "default".into(),
                deployment_name: "web".into(),
                created_time: created,
                phase: "Running".into(),
                node_name: "node-2".into(),
                ..Default::default()
            },
            PodInfo {
                name: "metrics-5c4b-x".into(),
                namespace: "monitoring".into(),
                deployment_name: "metrics".into(),
                created_time: created,
                phase: "Pending".into(),
                ..Default::default()
            },
        ],
        nodes: vec![
            NodeInfo {
                name: "node-1".into(),
                created_time: created,
                ready: true,
                cpu_capacity: "4".into(),
                memory_capacity: "16Gi".into(),
                kubelet_version: "v1.32.1".into(),
                ..Default::default()
            },
            NodeInfo {
                name: "node-2".into(),
                created_time: created,
                ready: false,
                ..Default::default()
            },
        ],
        services: vec![ServiceInfo {
            name: "web".into(),
            namespace: "default".into(),
            created_time: created,
            type_: "ClusterIP".into(),
            cluster_ip: "10.0.0.10".into(),
            external_ips: vec!["203.0.113.7".into()],
            ports: vec![ServicePort {
                name: "http".into(),
                protocol: "TCP".into(),
                port: 80,
                target_port: "8080".into(),
                node_port: None,
            }],
            selector: labels(&[("app", "web")]),
            ..Default::default()
        }],
        ingresses: vec![IngressInfo {
            name: "web".into(),
            namespace: "default".into(),
            created_time: created,
            hosts: vec!["web.example.com".into()],
            paths: vec![IngressPath {
                path: "/".into(),
                path_type: "Prefix".into(),
                service_name: "web".into(),
                service_port: 80,
            }],
            tls: vec![IngressTls {
                hosts: vec!["web.example.com".into()],
                secret_name: "web-tls".into(),
            }],
            ..Default::default()
        }],
        config_maps: vec![
            ConfigMapInfo {
                name: "web-config".into(),
                namespace: "default".into(),
                created_time: created,
                data: labels(&[("LOG_LEVEL", "info")]),
                ..Default::default()
            },
            ConfigMapInfo {
                name: "kube-root-ca.crt".into(),
                namespace: "monitoring".into(),
                created_time: created,
                ..Default::default()
            },
        ],
        secrets: vec![SecretInfo {
            name: "web-tls".into(),
            namespace: "default".into(),
            created_time: created,
            type_: "kubernetes.io/tls".into(),
            data_keys: vec!["tls.crt".into(), "tls.key".into()],
            ..Default::default()
        }],
        persistent_volumes: vec![PersistentVolumeInfo {
            name: "pv-data".into(),
            created_time: created,
            capacity: "10Gi".into(),
            access_modes: vec!["ReadWriteOnce".into()],
            reclaim_policy: "Retain".into(),
            storage_class: "standard".into(),
            volume_mode: "Filesystem".into(),
            status: "Bound".into(),
            claim_ref: "default/data".into(),
            volume_source: "hostPath".into(),
            ..Default::default()
        }],
        persistent_volume_claims: vec![PersistentVolumeClaimInfo {
            name: "data".into(),
            namespace: "default".into(),
            created_time: created,
            requested_size: "10Gi".into(),
            access_modes: vec!["ReadWriteOnce".into()],
            storage_class: "standard".into(),
            volume_mode: "Filesystem".into(),
            status: "Bound".into(),
            volume_name: "pv-data".into(),
            ..Default::default()
        }],
    }
}
