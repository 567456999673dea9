// Cluster collection. Nine listings, issued one after another against the same
// capture timestamp; the first failure discards the whole cycle.

pub mod extract;
mod kube_api;

pub use kube_api::KubeClusterApi;

use crate::error::CollectionError;
use crate::models::{ResourceKind, Snapshot};
use async_trait::async_trait;
use chrono::Utc;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{
    ConfigMap, Node, PersistentVolume, PersistentVolumeClaim, Pod, Secret, Service,
};
use k8s_openapi::api::networking::v1::Ingress;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Cluster-wide listings used by the collector.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn list_deployments(&self) -> anyhow::Result<Vec<Deployment>>;
    async fn list_pods(&self) -> anyhow::Result<Vec<Pod>>;
    async fn list_nodes(&self) -> anyhow::Result<Vec<Node>>;
    async fn list_services(&self) -> anyhow::Result<Vec<Service>>;
    async fn list_ingresses(&self) -> anyhow::Result<Vec<Ingress>>;
    async fn list_config_maps(&self) -> anyhow::Result<Vec<ConfigMap>>;
    async fn list_secrets(&self) -> anyhow::Result<Vec<Secret>>;
    async fn list_persistent_volumes(&self) -> anyhow::Result<Vec<PersistentVolume>>;
    async fn list_persistent_volume_claims(&self) -> anyhow::Result<Vec<PersistentVolumeClaim>>;
}

#[derive(Clone)]
pub struct Collector {
    api: Arc<dyn ClusterApi>,
}

impl Collector {
    pub fn new(api: Arc<dyn ClusterApi>) -> Self {
        Self { api }
    }

    /// Build one snapshot. No retries; the caller decides whether to run again.
    pub async fn collect(&self, cancel: &CancellationToken) -> Result<Snapshot, CollectionError> {
        let mut snapshot = Snapshot::empty(Utc::now());
        tracing::info!(captured_at = %snapshot.timestamp, "starting cluster collection");
        let api = self.api.as_ref();

        snapshot.deployments = list(ResourceKind::Deployments, cancel, api.list_deployments())
            .await?
            .iter()
            .map(extract::workload_info)
            .collect();
        snapshot.pods = list(ResourceKind::Pods, cancel, api.list_pods())
            .await?
            .iter()
            .map(extract::pod_info)
            .collect();
        snapshot.nodes = list(ResourceKind::Nodes, cancel, api.list_nodes())
            .await?
            .iter()
            .map(extract::node_info)
            .collect();
        snapshot.services = list(ResourceKind::Services, cancel, api.list_services())
            .await?
            .iter()
            .map(extract::service_info)
            .collect();
        snapshot.ingresses = list(ResourceKind::Ingresses, cancel, api.list_ingresses())
            .await?
            .iter()
            .map(extract::ingress_info)
            .collect();
        snapshot.config_maps = list(ResourceKind::ConfigMaps, cancel, api.list_config_maps())
            .await?
            .iter()
            .map(extract::config_map_info)
            .collect();
        snapshot.secrets = list(ResourceKind::Secrets, cancel, api.list_secrets())
            .await?
            .iter()
            .map(extract::secret_info)
            .collect();
        snapshot.persistent_volumes = list(
            ResourceKind::PersistentVolumes,
            cancel,
            api.list_persistent_volumes(),
        )
        .await?
        .iter()
        .map(extract::persistent_volume_info)
        .collect();
        snapshot.persistent_volume_claims = list(
            ResourceKind::PersistentVolumeClaims,
            cancel,
            api.list_persistent_volume_claims(),
        )
        .await?
        .iter()
        .map(extract::persistent_volume_claim_info)
        .collect();

        tracing::info!(total = snapshot.counts().total(), "cluster collection completed");
        Ok(snapshot)
    }
}

async fn list<T, F>(
    kind: ResourceKind,
    cancel: &CancellationToken,
    fut: F,
) -> Result<Vec<T>, CollectionError>
where
    F: Future<Output = anyhow::Result<Vec<T>>>,
{
    let items = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(CollectionError::Cancelled),
        r = fut => r.map_err(|source| CollectionError::List { kind, source })?,
    };
    tracing::info!(kind = %kind, count = items.len(), "collected");
    Ok(items)
}
