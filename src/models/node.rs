// Node records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Node status and resource quantities (kept as Kubernetes quantity strings, e.g. "4", "16Gi").
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeInfo {
    pub name: String,
    pub created_time: Option<DateTime<Utc>>,
    pub ready: bool,
    #[serde(default)]
    pub cpu_capacity: String,
    #[serde(default)]
    pub memory_capacity: String,
    #[serde(default)]
    pub storage_capacity: String,
    #[serde(default)]
    pub cpu_allocatable: String,
    #[serde(default)]
    pub memory_allocatable: String,
    #[serde(default)]
    pub storage_allocatable: String,
    #[serde(default)]
    pub os_image: String,
    #[serde(default)]
    pub kernel_version: String,
    #[serde(default)]
    pub kubelet_version: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}
