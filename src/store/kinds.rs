// Per-kind SQL. Every statement is a compile-time literal selected by ResourceKind;
// no table or column name is assembled at runtime.

use super::blob;
use crate::error::StoreError;
use crate::models::{
    ConfigMapInfo, IngressInfo, NodeInfo, PersistentVolumeClaimInfo, PersistentVolumeInfo,
    PodInfo, ResourceKind, SecretInfo, ServiceInfo, Snapshot, SnapshotId, WorkloadInfo,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqliteConnection;

pub(super) struct KindQueries {
    /// Params: snapshot_id, limit.
    pub select: &'static str,
    /// Params: snapshot_id, namespace, limit. None for cluster-scoped kinds.
    pub select_in_namespace: Option<&'static str>,
    /// Params: snapshot_id.
    pub count: &'static str,
    /// Params: JSON array of snapshot ids.
    pub delete_batch: &'static str,
}

macro_rules! namespaced {
    ($table:literal) => {
        KindQueries {
            select: concat!(
                "SELECT id, snapshot_id, name, namespace, created_time, data FROM ",
                $table,
                " WHERE snapshot_id = $1 ORDER BY created_time DESC, id ASC LIMIT $2"
            ),
            select_in_namespace: Some(concat!(
                "SELECT id, snapshot_id, name, namespace, created_time, data FROM ",
                $table,
                " WHERE snapshot_id = $1 AND namespace = $2 ORDER BY created_time DESC, id ASC LIMIT $3"
            )),
            count: concat!("SELECT COUNT(*) FROM ", $table, " WHERE snapshot_id = $1"),
            delete_batch: concat!(
                "DELETE FROM ",
                $table,
                " WHERE snapshot_id IN (SELECT value FROM json_each($1))"
            ),
        }
    };
}

macro_rules! cluster_scoped {
    ($table:literal) => {
        KindQueries {
            select: concat!(
                "SELECT id, snapshot_id, name, NULL AS namespace, created_time, data FROM ",
                $table,
                " WHERE snapshot_id = $1 ORDER BY created_time DESC, id ASC LIMIT $2"
            ),
            select_in_namespace: None,
            count: concat!("SELECT COUNT(*) FROM ", $table, " WHERE snapshot_id = $1"),
            delete_batch: concat!(
                "DELETE FROM ",
                $table,
                " WHERE snapshot_id IN (SELECT value FROM json_each($1))"
            ),
        }
    };
}

static DEPLOYMENTS: KindQueries = namespaced!("deployments");
static PODS: KindQueries = namespaced!("pods");
static NODES: KindQueries = cluster_scoped!("nodes");
static SERVICES: KindQueries = namespaced!("services");
static INGRESSES: KindQueries = namespaced!("ingresses");
static CONFIGMAPS: KindQueries = namespaced!("configmaps");
static SECRETS: KindQueries = namespaced!("secrets");
static PERSISTENT_VOLUMES: KindQueries = cluster_scoped!("persistent_volumes");
static PERSISTENT_VOLUME_CLAIMS: KindQueries = namespaced!("persistent_volume_claims");

pub(super) fn queries(kind: ResourceKind) -> &'static KindQueries {
    match kind {
        ResourceKind::Deployments => &DEPLOYMENTS,
        ResourceKind::Pods => &PODS,
        ResourceKind::Nodes => &NODES,
        ResourceKind::Services => &SERVICES,
        ResourceKind::Ingresses => &INGRESSES,
        ResourceKind::ConfigMaps => &CONFIGMAPS,
        ResourceKind::Secrets => &SECRETS,
        ResourceKind::PersistentVolumes => &PERSISTENT_VOLUMES,
        ResourceKind::PersistentVolumeClaims => &PERSISTENT_VOLUME_CLAIMS,
    }
}

/// Per-snapshot record counts for every kind, used by snapshot listings.
pub(super) const SELECT_SNAPSHOT_SUMMARIES: &str = r#"
    SELECT cs.id, cs.captured_at,
        (SELECT COUNT(*) FROM deployments WHERE snapshot_id = cs.id) AS deployments,
        (SELECT COUNT(*) FROM pods WHERE snapshot_id = cs.id) AS pods,
        (SELECT COUNT(*) FROM nodes WHERE snapshot_id = cs.id) AS nodes,
        (SELECT COUNT(*) FROM services WHERE snapshot_id = cs.id) AS services,
        (SELECT COUNT(*) FROM ingresses WHERE snapshot_id = cs.id) AS ingresses,
        (SELECT COUNT(*) FROM configmaps WHERE snapshot_id = cs.id) AS configmaps,
        (SELECT COUNT(*) FROM secrets WHERE snapshot_id = cs.id) AS secrets,
        (SELECT COUNT(*) FROM persistent_volumes WHERE snapshot_id = cs.id) AS persistent_volumes,
        (SELECT COUNT(*) FROM persistent_volume_claims WHERE snapshot_id = cs.id) AS persistent_volume_claims
    FROM cluster_snapshots cs
    ORDER BY cs.captured_at DESC, cs.id DESC
    LIMIT $1
"#;

/// Children before parent.
pub(super) const DELETE_ORDER: [ResourceKind; 9] = [
    ResourceKind::PersistentVolumeClaims,
    ResourceKind::PersistentVolumes,
    ResourceKind::Secrets,
    ResourceKind::ConfigMaps,
    ResourceKind::Ingresses,
    ResourceKind::Services,
    ResourceKind::Nodes,
    ResourceKind::Pods,
    ResourceKind::Deployments,
];

fn millis(t: &Option<DateTime<Utc>>) -> Option<i64> {
    t.as_ref().map(DateTime::timestamp_millis)
}

fn json_list(what: &str, values: &[String]) -> Result<String, StoreError> {
    serde_json::to_string(values).map_err(|e| StoreError::encode(what, e))
}

fn record_blob<T: Serialize>(kind: ResourceKind, name: &str, record: &T) -> Result<Vec<u8>, StoreError> {
    blob::encode(record).map_err(|e| StoreError::encode(format!("{} {}", kind, name), e))
}

/// Insert every child row of `snapshot` under `snapshot_id`, on the caller's transaction.
pub(super) async fn insert_all(
    conn: &mut SqliteConnection,
    snapshot_id: SnapshotId,
    snapshot: &Snapshot,
) -> Result<(), StoreError> {
    insert_deployments(conn, snapshot_id, &snapshot.deployments).await?;
    insert_pods(conn, snapshot_id, &snapshot.pods).await?;
    insert_nodes(conn, snapshot_id, &snapshot.nodes).await?;
    insert_services(conn, snapshot_id, &snapshot.services).await?;
    insert_ingresses(conn, snapshot_id, &snapshot.ingresses).await?;
    insert_config_maps(conn, snapshot_id, &snapshot.config_maps).await?;
    insert_secrets(conn, snapshot_id, &snapshot.secrets).await?;
    insert_persistent_volumes(conn, snapshot_id, &snapshot.persistent_volumes).await?;
    insert_persistent_volume_claims(conn, snapshot_id, &snapshot.persistent_volume_claims).await?;
    Ok(())
}

async fn insert_deployments(
    conn: &mut SqliteConnection,
    snapshot_id: SnapshotId,
    deployments: &[WorkloadInfo],
) -> Result<(), StoreError> {
    for d in deployments {
        let data = record_blob(ResourceKind::Deployments, &d.name, d)?;
        sqlx::query(
            "INSERT INTO deployments (snapshot_id, name, namespace, created_time, replicas, ready_replicas, updated_replicas, data)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(snapshot_id)
        .bind(&d.name)
        .bind(&d.namespace)
        .bind(millis(&d.created_time))
        .bind(d.replicas)
        .bind(d.ready_replicas)
        .bind(d.updated_replicas)
        .bind(&data)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn insert_pods(
    conn: &mut SqliteConnection,
    snapshot_id: SnapshotId,
    pods: &[PodInfo],
) -> Result<(), StoreError> {
    for p in pods {
        let data = record_blob(ResourceKind::Pods, &p.name, p)?;
        sqlx::query(
            "INSERT INTO pods (snapshot_id, name, namespace, deployment_name, created_time, phase, node_name, restart_count,
                               cpu_request, cpu_limit, memory_request, memory_limit, storage_request, data)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(snapshot_id)
        .bind(&p.name)
        .bind(&p.namespace)
        .bind(&p.deployment_name)
        .bind(millis(&p.created_time))
        .bind(&p.phase)
        .bind(&p.node_name)
        .bind(p.restart_count)
        .bind(&p.cpu_request)
        .bind(&p.cpu_limit)
        .bind(&p.memory_request)
        .bind(&p.memory_limit)
        .bind(&p.storage_request)
        .bind(&data)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn insert_nodes(
    conn: &mut SqliteConnection,
    snapshot_id: SnapshotId,
    nodes: &[NodeInfo],
) -> Result<(), StoreError> {
    for n in nodes {
        let data = record_blob(ResourceKind::Nodes, &n.name, n)?;
        sqlx::query(
            "INSERT INTO nodes (snapshot_id, name, created_time, ready, cpu_capacity, memory_capacity, storage_capacity,
                                cpu_allocatable, memory_allocatable, storage_allocatable, os_image, kernel_version,
                                kubelet_version, data)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(snapshot_id)
        .bind(&n.name)
        .bind(millis(&n.created_time))
        .bind(n.ready)
        .bind(&n.cpu_capacity)
        .bind(&n.memory_capacity)
        .bind(&n.storage_capacity)
        .bind(&n.cpu_allocatable)
        .bind(&n.memory_allocatable)
        .bind(&n.storage_allocatable)
        .bind(&n.os_image)
        .bind(&n.kernel_version)
        .bind(&n.kubelet_version)
        .bind(&data)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn insert_services(
    conn: &mut SqliteConnection,
    snapshot_id: SnapshotId,
    services: &[ServiceInfo],
) -> Result<(), StoreError> {
    for s in services {
        let data = record_blob(ResourceKind::Services, &s.name, s)?;
        let external_ips = json_list("service external_ips", &s.external_ips)?;
        sqlx::query(
            "INSERT INTO services (snapshot_id, name, namespace, created_time, type, cluster_ip, external_ips, data)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(snapshot_id)
        .bind(&s.name)
        .bind(&s.namespace)
        .bind(millis(&s.created_time))
        .bind(&s.type_)
        .bind(&s.cluster_ip)
        .bind(&external_ips)
        .bind(&data)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn insert_ingresses(
    conn: &mut SqliteConnection,
    snapshot_id: SnapshotId,
    ingresses: &[IngressInfo],
) -> Result<(), StoreError> {
    for i in ingresses {
        let data = record_blob(ResourceKind::Ingresses, &i.name, i)?;
        let hosts = json_list("ingress hosts", &i.hosts)?;
        sqlx::query(
            "INSERT INTO ingresses (snapshot_id, name, namespace, created_time, hosts, data)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(snapshot_id)
        .bind(&i.name)
        .bind(&i.namespace)
        .bind(millis(&i.created_time))
        .bind(&hosts)
        .bind(&data)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn insert_config_maps(
    conn: &mut SqliteConnection,
    snapshot_id: SnapshotId,
    config_maps: &[ConfigMapInfo],
) -> Result<(), StoreError> {
    for cm in config_maps {
        let data = record_blob(ResourceKind::ConfigMaps, &cm.name, cm)?;
        let data_keys = json_list("configmap data_keys", &cm.data_keys())?;
        sqlx::query(
            "INSERT INTO configmaps (snapshot_id, name, namespace, created_time, data_keys, data)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(snapshot_id)
        .bind(&cm.name)
        .bind(&cm.namespace)
        .bind(millis(&cm.created_time))
        .bind(&data_keys)
        .bind(&data)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn insert_secrets(
    conn: &mut SqliteConnection,
    snapshot_id: SnapshotId,
    secrets: &[SecretInfo],
) -> Result<(), StoreError> {
    for s in secrets {
        let data = record_blob(ResourceKind::Secrets, &s.name, s)?;
        let data_keys = json_list("secret data_keys", &s.data_keys)?;
        sqlx::query(
            "INSERT INTO secrets (snapshot_id, name, namespace, created_time, type, data_keys, data)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(snapshot_id)
        .bind(&s.name)
        .bind(&s.namespace)
        .bind(millis(&s.created_time))
        .bind(&s.type_)
        .bind(&data_keys)
        .bind(&data)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn insert_persistent_volumes(
    conn: &mut SqliteConnection,
    snapshot_id: SnapshotId,
    volumes: &[PersistentVolumeInfo],
) -> Result<(), StoreError> {
    for pv in volumes {
        let data = record_blob(ResourceKind::PersistentVolumes, &pv.name, pv)?;
        let access_modes = json_list("persistent volume access_modes", &pv.access_modes)?;
        sqlx::query(
            "INSERT INTO persistent_volumes (snapshot_id, name, created_time, capacity, access_modes, reclaim_policy,
                                             storage_class, status, volume_source, data)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(snapshot_id)
        .bind(&pv.name)
        .bind(millis(&pv.created_time))
        .bind(&pv.capacity)
        .bind(&access_modes)
        .bind(&pv.reclaim_policy)
        .bind(&pv.storage_class)
        .bind(&pv.status)
        .bind(&pv.volume_source)
        .bind(&data)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn insert_persistent_volume_claims(
    conn: &mut SqliteConnection,
    snapshot_id: SnapshotId,
    claims: &[PersistentVolumeClaimInfo],
) -> Result<(), StoreError> {
    for pvc in claims {
        let data = record_blob(ResourceKind::PersistentVolumeClaims, &pvc.name, pvc)?;
        let access_modes = json_list("persistent volume claim access_modes", &pvc.access_modes)?;
        sqlx::query(
            "INSERT INTO persistent_volume_claims (snapshot_id, name, namespace, created_time, requested_size,
                                                   access_modes, storage_class, status, volume_name, data)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(snapshot_id)
        .bind(&pvc.name)
        .bind(&pvc.namespace)
        .bind(millis(&pvc.created_time))
        .bind(&pvc.requested_size)
        .bind(&access_modes)
        .bind(&pvc.storage_class)
        .bind(&pvc.status)
        .bind(&pvc.volume_name)
        .bind(&data)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}
