// Subscriber core: decode, persist, mark. Independent of the broker client so
// partition handling can be driven by any source of messages.

mod kafka;

pub use kafka::{KafkaSubscriber, consumer_config};

use crate::error::{ProcessingError, StoreError};
use crate::models::{Snapshot, SnapshotId};
use crate::stats::PipelineStats;
use crate::store::SnapshotStore;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One message as read from a partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub partition: i32,
    pub offset: i64,
    pub payload: Option<Vec<u8>>,
    pub timestamp_ms: Option<i64>,
}

/// Destination for decoded snapshots.
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    async fn persist(&self, snapshot: &Snapshot) -> Result<SnapshotId, StoreError>;
}

#[async_trait]
impl SnapshotSink for SnapshotStore {
    async fn persist(&self, snapshot: &Snapshot) -> Result<SnapshotId, StoreError> {
        SnapshotStore::persist(self, snapshot).await
    }
}

/// Records that a message has been handled so its offset is committed.
pub trait OffsetMarker: Send + Sync {
    fn mark(&self, partition: i32, offset: i64) -> anyhow::Result<()>;
}

/// Per-message lifecycle inside a partition worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageState {
    Claimed,
    Processing,
    Committed,
}

impl MessageState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageState::Claimed => "claimed",
            MessageState::Processing => "processing",
            MessageState::Committed => "committed",
        }
    }
}

pub fn decode(payload: Option<&[u8]>) -> Result<Snapshot, ProcessingError> {
    Ok(serde_json::from_slice(payload.unwrap_or_default())?)
}

/// Delay before retry `attempt` (0-based): doubles from `initial`, capped at `max`.
pub fn backoff_delay(attempt: u32, initial: Duration, max: Duration) -> Duration {
    let multiplier = 2u32.saturating_pow(attempt);
    initial.saturating_mul(multiplier).min(max)
}

/// Handles the messages of one partition strictly in order.
pub struct PartitionWorker {
    partition: i32,
    sink: Arc<dyn SnapshotSink>,
    marker: Arc<dyn OffsetMarker>,
    stats: Arc<PipelineStats>,
}

impl PartitionWorker {
    pub fn new(
        partition: i32,
        sink: Arc<dyn SnapshotSink>,
        marker: Arc<dyn OffsetMarker>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            partition,
            sink,
            marker,
            stats,
        }
    }

    /// Decode and persist one message, then mark its offset. The offset is marked
    /// whether or not processing succeeded; failed messages are logged and not retried.
    pub async fn handle(&self, msg: InboundMessage) -> Result<SnapshotId, ProcessingError> {
        let partition = self.partition;
        let offset = msg.offset;
        let timestamp_ms = msg.timestamp_ms;
        if let Some(ts) = timestamp_ms {
            self.stats.observe_message_time(ts);
        }
        tracing::debug!(
            partition,
            offset,
            timestamp_ms,
            state = MessageState::Claimed.as_str(),
            "message state"
        );

        let result = match decode(msg.payload.as_deref()) {
            Ok(snapshot) => {
                tracing::debug!(partition, offset, state = MessageState::Processing.as_str(), "message state");
                self.sink.persist(&snapshot).await.map_err(ProcessingError::from)
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(snapshot_id) => {
                PipelineStats::incr(&self.stats.messages_processed, 1);
                PipelineStats::incr(&self.stats.snapshots_persisted, 1);
                tracing::info!(partition, offset, timestamp_ms, snapshot_id, "message persisted");
            }
            Err(e) => {
                PipelineStats::incr(&self.stats.messages_failed, 1);
                tracing::error!(partition, offset, timestamp_ms, error = %e, "message skipped");
            }
        }

        match self.marker.mark(partition, offset) {
            Ok(()) => {
                tracing::debug!(partition, offset, state = MessageState::Committed.as_str(), "message state");
            }
            Err(e) => {
                tracing::warn!(partition, offset, error = %e, "failed to mark offset");
            }
        }
        result
    }

    /// Drain `rx` until it closes or `cancel` fires. A message already being
    /// processed is finished before returning.
    pub async fn run(self, mut rx: mpsc::Receiver<InboundMessage>, cancel: CancellationToken) {
        tracing::info!(partition = self.partition, "partition worker started");
        loop {
            let msg = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                m = rx.recv() => match m {
                    Some(m) => m,
                    None => break,
                },
            };
            let _ = self.handle(msg).await;
        }
        tracing::info!(partition = self.partition, "partition worker stopped");
    }
}
