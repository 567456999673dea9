use super::ClusterApi;
use crate::config::KubernetesConfig;
use anyhow::Context;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{
    ConfigMap, Node, PersistentVolume, PersistentVolumeClaim, Pod, Secret, Service,
};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};

/// [`ClusterApi`] over a live API server.
#[derive(Clone)]
pub struct KubeClusterApi {
    client: Client,
}

impl KubeClusterApi {
    /// Kubeconfig file when configured, otherwise the inferred config
    /// (in-cluster service account or the default kubeconfig).
    pub async fn connect(config: &KubernetesConfig) -> anyhow::Result<Self> {
        let options = KubeConfigOptions {
            context: config.context.clone(),
            ..Default::default()
        };
        let kube_config = match (&config.kubeconfig, &config.context) {
            (Some(path), _) => {
                let kubeconfig = Kubeconfig::read_from(path)
                    .with_context(|| format!("reading kubeconfig {}", path))?;
                Config::from_custom_kubeconfig(kubeconfig, &options).await?
            }
            (None, Some(_)) => Config::from_kubeconfig(&options).await?,
            (None, None) => Config::infer().await?,
        };
        let client = Client::try_from(kube_config)?;
        Ok(Self { client })
    }

    pub async fn check_connection(&self) -> anyhow::Result<()> {
        let info = self
            .client
            .apiserver_version()
            .await
            .context("querying API server version")?;
        tracing::info!(git_version = %info.git_version, platform = %info.platform, "connected to cluster");
        Ok(())
    }

    async fn list_all<K>(&self) -> anyhow::Result<Vec<K>>
    where
        K: kube::Resource + Clone + serde::de::DeserializeOwned + std::fmt::Debug,
        K::DynamicType: Default,
    {
        let api: Api<K> = Api::all(self.client.clone());
        Ok(api.list(&ListParams::default()).await?.items)
    }
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn list_deployments(&self) -> anyhow::Result<Vec<Deployment>> {
        self.list_all().await
    }

    async fn list_pods(&self) -> anyhow::Result<Vec<Pod>> {
        self.list_all().await
    }

    async fn list_nodes(&self) -> anyhow::Result<Vec<Node>> {
        self.list_all().await
    }

    async fn list_services(&self) -> anyhow::Result<Vec<Service>> {
        self.list_all().await
    }

    async fn list_ingresses(&self) -> anyhow::Result<Vec<Ingress>> {
        self.list_all().await
    }

    async fn list_config_maps(&self) -> anyhow::Result<Vec<ConfigMap>> {
        self.list_all().await
    }

    async fn list_secrets(&self) -> anyhow::Result<Vec<Secret>> {
        self.list_all().await
    }

    async fn list_persistent_volumes(&self) -> anyhow::Result<Vec<PersistentVolume>> {
        self.list_all().await
    }

    async fn list_persistent_volume_claims(&self) -> anyhow::Result<Vec<PersistentVolumeClaim>> {
        self.list_all().await
    }
}
