// Pipeline counters. Created once per process and handed to each component.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct PipelineStats {
    pub messages_processed: AtomicU64,
    pub messages_failed: AtomicU64,
    pub consume_errors: AtomicU64,
    pub snapshots_persisted: AtomicU64,
    pub snapshots_retired: AtomicU64,
    pub retention_failures: AtomicU64,
    /// Broker timestamp of the newest message seen, 0 until one carries a timestamp.
    pub newest_message_ms: AtomicI64,
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub messages_processed: u64,
    pub messages_failed: u64,
    pub consume_errors: u64,
    pub snapshots_persisted: u64,
    pub snapshots_retired: u64,
    pub retention_failures: u64,
    pub newest_message_ms: i64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn incr(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn observe_message_time(&self, timestamp_ms: i64) {
        self.newest_message_ms.fetch_max(timestamp_ms, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            messages_processed: self.messages_processed.load(Ordering::Relaxed),
            messages_failed: self.messages_failed.load(Ordering::Relaxed),
            consume_errors: self.consume_errors.load(Ordering::Relaxed),
            snapshots_persisted: self.snapshots_persisted.load(Ordering::Relaxed),
            snapshots_retired: self.snapshots_retired.load(Ordering::Relaxed),
            retention_failures: self.retention_failures.load(Ordering::Relaxed),
            newest_message_ms: self.newest_message_ms.load(Ordering::Relaxed),
        }
    }

    pub fn log(&self) {
        let s = self.snapshot();
        tracing::info!(
            messages_processed = s.messages_processed,
            messages_failed = s.messages_failed,
            consume_errors = s.consume_errors,
            snapshots_persisted = s.snapshots_persisted,
            snapshots_retired = s.snapshots_retired,
            retention_failures = s.retention_failures,
            newest_message_ms = s.newest_message_ms,
            "pipeline stats"
        );
    }
}
