// One collection cycle: collect, then hand the snapshot to the configured output.

use crate::collector::Collector;
use crate::error::{CollectionError, PublishError, StoreError};
use crate::models::SnapshotId;
use crate::publisher::{PublishAck, Publisher};
use crate::store::SnapshotStore;
use tokio_util::sync::CancellationToken;

/// Where collected snapshots go. Chosen once at startup.
pub enum SnapshotOutput {
    /// Publish to the log for the consumer to persist.
    Log(Publisher),
    /// Write straight to the store.
    Database(SnapshotStore),
}

impl SnapshotOutput {
    pub fn describe(&self) -> &'static str {
        match self {
            SnapshotOutput::Log(_) => "log",
            SnapshotOutput::Database(_) => "database",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Published(PublishAck),
    Stored(SnapshotId),
}

#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error(transparent)]
    Collection(#[from] CollectionError),
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CycleError {
    /// The cycle was abandoned by shutdown rather than failing on its own.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            CycleError::Collection(CollectionError::Cancelled)
                | CycleError::Publish(PublishError::Cancelled)
        )
    }
}

/// Collect once and deliver. Nothing is published or stored when collection fails.
pub async fn run_once(
    collector: &Collector,
    output: &SnapshotOutput,
    cancel: &CancellationToken,
) -> Result<CycleOutcome, CycleError> {
    let snapshot = collector.collect(cancel).await?;
    let outcome = match output {
        SnapshotOutput::Log(publisher) => {
            CycleOutcome::Published(publisher.publish(&snapshot, cancel).await?)
        }
        SnapshotOutput::Database(store) => CycleOutcome::Stored(store.persist(&snapshot).await?),
    };
    tracing::info!(output = output.describe(), outcome = ?outcome, "collection cycle complete");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResourceKind;

    #[test]
    fn only_shutdown_errors_count_as_cancelled() {
        assert!(CycleError::from(CollectionError::Cancelled).is_cancelled());
        assert!(CycleError::from(PublishError::Cancelled).is_cancelled());

        let listing = CollectionError::List {
            kind: ResourceKind::Pods,
            source: anyhow::anyhow!("forbidden"),
        };
        assert!(!CycleError::from(listing).is_cancelled());
        let encode = serde_json::from_str::<u8>("x").unwrap_err();
        assert!(!CycleError::from(PublishError::Serialize(encode)).is_cancelled());
    }
}
