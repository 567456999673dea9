// Pipeline error taxonomy.
// Collection and publish errors end the current cycle; processing and retention
// errors are logged by their owning loop and the loop carries on.

use crate::models::{ResourceKind, SnapshotId};

#[derive(Debug, thiserror::Error)]
pub enum CollectionError {
    #[error("failed to list {kind}: {source}")]
    List {
        kind: ResourceKind,
        #[source]
        source: anyhow::Error,
    },
    #[error("collection cancelled")]
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to send snapshot to topic {topic}: {source}")]
    Send {
        topic: String,
        #[source]
        source: rdkafka::error::KafkaError,
    },
    #[error("publish cancelled")]
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("failed to encode {what}: {source}")]
    Encode {
        what: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to decode stored snapshot {id}: {source}")]
    Decode {
        id: SnapshotId,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn encode(what: impl Into<String>, source: serde_json::Error) -> Self {
        StoreError::Encode {
            what: what.into(),
            source,
        }
    }
}

/// A received message that could not be turned into a stored snapshot.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("failed to decode snapshot message: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("failed to persist snapshot: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, thiserror::Error)]
#[error("{policy} cleanup failed: {source}")]
pub struct RetentionError {
    pub policy: &'static str,
    #[source]
    pub source: StoreError,
}
