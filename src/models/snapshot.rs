// Snapshot aggregate and the resource kinds it carries

use super::{
    ConfigMapInfo, IngressInfo, NodeInfo, PersistentVolumeClaimInfo, PersistentVolumeInfo,
    PodInfo, SecretInfo, ServiceInfo, WorkloadInfo,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier assigned by the store when a snapshot is persisted.
pub type SnapshotId = i64;

/// One point-in-time capture of cluster state.
///
/// Has no identity of its own; the store assigns a [`SnapshotId`] on insert.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub deployments: Vec<WorkloadInfo>,
    #[serde(default)]
    pub pods: Vec<PodInfo>,
    #[serde(default)]
    pub nodes: Vec<NodeInfo>,
    #[serde(default)]
    pub services: Vec<ServiceInfo>,
    #[serde(default)]
    pub ingresses: Vec<IngressInfo>,
    #[serde(default, rename = "configmaps")]
    pub config_maps: Vec<ConfigMapInfo>,
    #[serde(default)]
    pub secrets: Vec<SecretInfo>,
    #[serde(default)]
    pub persistent_volumes: Vec<PersistentVolumeInfo>,
    #[serde(default)]
    pub persistent_volume_claims: Vec<PersistentVolumeClaimInfo>,
}

impl Snapshot {
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            ..Default::default()
        }
    }

    pub fn count(&self, kind: ResourceKind) -> usize {
        match kind {
            ResourceKind::Deployments => self.deployments.len(),
            ResourceKind::Pods => self.pods.len(),
            ResourceKind::Nodes => self.nodes.len(),
            ResourceKind::Services => self.services.len(),
            ResourceKind::Ingresses => self.ingresses.len(),
            ResourceKind::ConfigMaps => self.config_maps.len(),
            ResourceKind::Secrets => self.secrets.len(),
            ResourceKind::PersistentVolumes => self.persistent_volumes.len(),
            ResourceKind::PersistentVolumeClaims => self.persistent_volume_claims.len(),
        }
    }

    pub fn counts(&self) -> ResourceCounts {
        let mut counts = ResourceCounts::default();
        for kind in ResourceKind::ALL {
            counts.set(kind, self.count(kind) as i64);
        }
        counts
    }

    /// Capture time in Unix milliseconds (the value stored in the parent row).
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

/// The nine tracked resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Deployments,
    Pods,
    Nodes,
    Services,
    Ingresses,
    #[serde(rename = "configmaps")]
    ConfigMaps,
    Secrets,
    PersistentVolumes,
    PersistentVolumeClaims,
}

impl ResourceKind {
    /// Listing order used by the collector and insert order used by the store.
    pub const ALL: [ResourceKind; 9] = [
        ResourceKind::Deployments,
        ResourceKind::Pods,
        ResourceKind::Nodes,
        ResourceKind::Services,
        ResourceKind::Ingresses,
        ResourceKind::ConfigMaps,
        ResourceKind::Secrets,
        ResourceKind::PersistentVolumes,
        ResourceKind::PersistentVolumeClaims,
    ];

    /// Snapshot JSON field name; also the child table name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Deployments => "deployments",
            ResourceKind::Pods => "pods",
            ResourceKind::Nodes => "nodes",
            ResourceKind::Services => "services",
            ResourceKind::Ingresses => "ingresses",
            ResourceKind::ConfigMaps => "configmaps",
            ResourceKind::Secrets => "secrets",
            ResourceKind::PersistentVolumes => "persistent_volumes",
            ResourceKind::PersistentVolumeClaims => "persistent_volume_claims",
        }
    }

    /// Nodes and persistent volumes are cluster-scoped.
    pub fn is_namespaced(&self) -> bool {
        !matches!(
            self,
            ResourceKind::Nodes | ResourceKind::PersistentVolumes
        )
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown resource kind: {0}")]
pub struct UnknownResourceKind(pub String);

impl FromStr for ResourceKind {
    type Err = UnknownResourceKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_ascii_lowercase().replace('-', "_");
        ResourceKind::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| UnknownResourceKind(s.to_string()))
    }
}

/// Per-kind record counts for one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceCounts {
    pub deployments: i64,
    pub pods: i64,
    pub nodes: i64,
    pub services: i64,
    pub ingresses: i64,
    pub configmaps: i64,
    pub secrets: i64,
    pub persistent_volumes: i64,
    pub persistent_volume_claims: i64,
}

impl ResourceCounts {
    pub fn get(&self, kind: ResourceKind) -> i64 {
        match kind {
            ResourceKind::Deployments => self.deployments,
            ResourceKind::Pods => self.pods,
            ResourceKind::Nodes => self.nodes,
            ResourceKind::Services => self.services,
            ResourceKind::Ingresses => self.ingresses,
            ResourceKind::ConfigMaps => self.configmaps,
            ResourceKind::Secrets => self.secrets,
            ResourceKind::PersistentVolumes => self.persistent_volumes,
            ResourceKind::PersistentVolumeClaims => self.persistent_volume_claims,
        }
    }

    pub fn set(&mut self, kind: ResourceKind, value: i64) {
        let slot = match kind {
            ResourceKind::Deployments => &mut self.deployments,
            ResourceKind::Pods => &mut self.pods,
            ResourceKind::Nodes => &mut self.nodes,
            ResourceKind::Services => &mut self.services,
            ResourceKind::Ingresses => &mut self.ingresses,
            ResourceKind::ConfigMaps => &mut self.configmaps,
            ResourceKind::Secrets => &mut self.secrets,
            ResourceKind::PersistentVolumes => &mut self.persistent_volumes,
            ResourceKind::PersistentVolumeClaims => &mut self.persistent_volume_claims,
        };
        *slot = value;
    }

    pub fn total(&self) -> i64 {
        ResourceKind::ALL.iter().map(|k| self.get(*k)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_kind_parses_table_names() {
        for kind in ResourceKind::ALL {
            assert_eq!(kind.as_str().parse::<ResourceKind>().unwrap(), kind);
        }
        assert_eq!(
            "persistent-volume-claims".parse::<ResourceKind>().unwrap(),
            ResourceKind::PersistentVolumeClaims
        );
        assert!("replicasets".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn resource_kind_serde_matches_as_str() {
        for kind in ResourceKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn counts_follow_collection_sizes() {
        let mut s = Snapshot::empty(Utc::now());
        s.pods = vec![PodInfo::default(), PodInfo::default()];
        s.secrets = vec![SecretInfo::default()];
        let counts = s.counts();
        assert_eq!(counts.pods, 2);
        assert_eq!(counts.secrets, 1);
        assert_eq!(counts.nodes, 0);
        assert_eq!(counts.total(), 3);
    }
}
