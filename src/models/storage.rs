// Persistent volume and claim records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersistentVolumeInfo {
    pub name: String,
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub capacity: String,
    #[serde(default)]
    pub access_modes: Vec<String>,
    #[serde(default)]
    pub reclaim_policy: String,
    #[serde(default)]
    pub storage_class: String,
    #[serde(default)]
    pub volume_mode: String,
    /// Volume phase (Available, Bound, Released, Failed).
    #[serde(default)]
    pub status: String,
    /// "namespace/name" of the bound claim, if any.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub claim_ref: String,
    #[serde(default)]
    pub volume_source: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersistentVolumeClaimInfo {
    pub name: String,
    pub namespace: String,
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub requested_size: String,
    #[serde(default)]
    pub access_modes: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub storage_class: String,
    #[serde(default)]
    pub volume_mode: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub volume_name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}
