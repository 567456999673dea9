// Snapshot model: one capture of cluster state across nine resource kinds

mod config_object;
mod network;
mod node;
mod snapshot;
mod storage;
mod workload;

pub use config_object::{ConfigMapInfo, SecretInfo};
pub use network::{IngressInfo, IngressPath, IngressTls, ServiceInfo, ServicePort};
pub use node::NodeInfo;
pub use snapshot::{ResourceCounts, ResourceKind, Snapshot, SnapshotId, UnknownResourceKind};
pub use storage::{PersistentVolumeClaimInfo, PersistentVolumeInfo};
pub use workload::{
    ContainerState, ContainerStatusInfo, DeploymentCondition, PodInfo, WorkloadInfo,
};
