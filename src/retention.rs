// Retention: delete snapshots past the age limit or beyond the count limit,
// oldest first, one bounded batch per policy per tick.
// VACUUM runs on its own schedule (cron expression or fixed interval).

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::config::RetentionConfig;
use crate::error::RetentionError;
use crate::stats::PipelineStats;
use crate::store::SnapshotStore;

/// Snapshots deleted by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetentionReport {
    pub age_deleted: u64,
    pub count_deleted: u64,
    pub failures: u32,
}

impl RetentionReport {
    pub fn total_deleted(&self) -> u64 {
        self.age_deleted + self.count_deleted
    }
}

pub struct RetentionManager {
    store: SnapshotStore,
    config: RetentionConfig,
    stats: Arc<PipelineStats>,
}

impl RetentionManager {
    pub fn new(store: SnapshotStore, config: RetentionConfig, stats: Arc<PipelineStats>) -> Self {
        Self {
            store,
            config,
            stats,
        }
    }

    /// Delete up to one batch of snapshots captured before `now - max_age`.
    pub async fn apply_age_policy(&self, now: DateTime<Utc>) -> Result<u64, RetentionError> {
        if self.config.max_age_secs == 0 {
            return Ok(0);
        }
        let max_age_ms = i64::try_from(self.config.max_age_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
        let cutoff = now.timestamp_millis().saturating_sub(max_age_ms);
        let err = |source| RetentionError {
            policy: "age",
            source,
        };
        let ids = self
            .store
            .select_ids_older_than(cutoff, self.config.delete_batch_size)
            .await
            .map_err(err)?;
        if ids.is_empty() {
            return Ok(0);
        }
        self.store.delete_snapshots(&ids).await.map_err(err)
    }

    /// Delete up to one batch of the oldest snapshots beyond `max_snapshots`.
    pub async fn apply_count_policy(&self) -> Result<u64, RetentionError> {
        if self.config.max_snapshots == 0 {
            return Ok(0);
        }
        let err = |source| RetentionError {
            policy: "count",
            source,
        };
        let total = self.store.count_snapshots().await.map_err(err)?;
        let excess = u64::try_from(total).unwrap_or(0).saturating_sub(self.config.max_snapshots);
        if excess == 0 {
            return Ok(0);
        }
        let limit = excess.min(u64::from(self.config.delete_batch_size)) as u32;
        let ids = self.store.select_oldest_ids(limit).await.map_err(err)?;
        self.store.delete_snapshots(&ids).await.map_err(err)
    }

    /// One cleanup tick at `now`. Both policies run; a failing policy is logged and
    /// counted and does not stop the other.
    #[instrument(skip(self), fields(operation = "retention"))]
    pub async fn run_once_at(&self, now: DateTime<Utc>) -> RetentionReport {
        let mut report = RetentionReport::default();

        match self.apply_age_policy(now).await {
            Ok(n) => report.age_deleted = n,
            Err(e) => {
                report.failures += 1;
                warn!(error = %e, "retention policy failed");
            }
        }
        match self.apply_count_policy().await {
            Ok(n) => report.count_deleted = n,
            Err(e) => {
                report.failures += 1;
                warn!(error = %e, "retention policy failed");
            }
        }

        PipelineStats::incr(&self.stats.snapshots_retired, report.total_deleted());
        PipelineStats::incr(&self.stats.retention_failures, u64::from(report.failures));
        if report.total_deleted() > 0 {
            info!(
                age_deleted = report.age_deleted,
                count_deleted = report.count_deleted,
                "retention cleanup"
            );
        }
        report
    }

    pub async fn run_once(&self) -> RetentionReport {
        self.run_once_at(Utc::now()).await
    }

    /// Run cleanup every `cleanup_interval_secs` and VACUUM on its schedule until cancelled.
    pub fn spawn(self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run(cancel).await;
        })
    }

    #[instrument(skip_all, fields(interval_secs = self.config.cleanup_interval_secs))]
    async fn run(self, cancel: CancellationToken) {
        let mut cleanup_interval =
            tokio::time::interval(Duration::from_secs(self.config.cleanup_interval_secs));
        cleanup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let (vacuum_tx, mut vacuum_rx) = tokio::sync::mpsc::channel::<()>(1);
        tokio::spawn(vacuum_scheduler(
            self.config.clone(),
            vacuum_tx,
            cancel.clone(),
        ));

        info!(
            max_age_secs = self.config.max_age_secs,
            max_snapshots = self.config.max_snapshots,
            batch = self.config.delete_batch_size,
            "retention manager started"
        );
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = cleanup_interval.tick() => {
                    self.run_once().await;
                }
                Some(()) = vacuum_rx.recv() => {
                    if let Err(e) = self.store.vacuum().await {
                        warn!(error = %e, "vacuum failed");
                    } else {
                        info!("vacuum complete");
                    }
                }
            }
        }
        info!("retention manager stopped");
    }
}

/// Sends on `tx` at each VACUUM time (cron or fixed interval). Cron uses local time.
async fn vacuum_scheduler(
    config: RetentionConfig,
    tx: tokio::sync::mpsc::Sender<()>,
    cancel: CancellationToken,
) {
    let next_delay: Box<dyn Fn() -> Duration + Send + Sync> = match config.vacuum_schedule {
        Some(ref cron_str) => {
            let Ok(schedule) = cron::Schedule::from_str(cron_str) else {
                warn!(cron = %cron_str, "invalid vacuum_schedule; VACUUM will not run");
                return;
            };
            Box::new(move || {
                let now = chrono::Local::now();
                match schedule.after(&now).next() {
                    Some(next) => (next - now).to_std().unwrap_or(Duration::from_secs(1)),
                    None => Duration::from_secs(3600),
                }
            })
        }
        None => {
            let interval = Duration::from_secs(config.vacuum_interval_secs);
            Box::new(move || interval)
        }
    };

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(next_delay()) => {
                if tx.send(()).await.is_err() {
                    break;
                }
            }
        }
    }
}
