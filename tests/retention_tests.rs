// Retention policy tests: age cutoff, count cap, batch bounds

mod common;

use chrono::Duration;
use cluster_snapshot::config::RetentionConfig;
use cluster_snapshot::retention::RetentionManager;
use cluster_snapshot::stats::PipelineStats;
use common::{at_ms, sample_snapshot, temp_store};
use std::sync::Arc;

const HOUR_MS: i64 = 3_600_000;
const NOW_MS: i64 = 1_700_000_000_000;

fn config(max_age_secs: u64, max_snapshots: u64, batch: u32) -> RetentionConfig {
    RetentionConfig {
        enabled: true,
        max_age_secs,
        max_snapshots,
        delete_batch_size: batch,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_age_policy_deletes_only_snapshots_before_cutoff() {
    let (_dir, store) = temp_store().await;
    let mut ids = Vec::new();
    // 10h, 8h, ..., 0h old
    for hours in (0..=10).rev().step_by(2) {
        ids.push(store.persist(&sample_snapshot(NOW_MS - hours * HOUR_MS)).await.unwrap());
    }

    let stats = Arc::new(PipelineStats::new());
    let manager = RetentionManager::new(store.clone(), config(5 * 3600, 0, 100), stats.clone());
    let report = manager.run_once_at(at_ms(NOW_MS)).await;

    // 10h, 8h and 6h old are past the 5h limit
    assert_eq!(report.age_deleted, 3);
    assert_eq!(report.count_deleted, 0);
    assert_eq!(report.failures, 0);
    assert_eq!(store.count_snapshots().await.unwrap(), 3);
    assert_eq!(store.select_oldest_ids(10).await.unwrap(), ids[3..].to_vec());
    assert_eq!(stats.snapshot().snapshots_retired, 3);
}

#[tokio::test]
async fn test_age_policy_keeps_snapshot_exactly_at_cutoff() {
    let (_dir, store) = temp_store().await;
    store.persist(&sample_snapshot(NOW_MS - HOUR_MS)).await.unwrap();

    let manager = RetentionManager::new(store.clone(), config(3600, 0, 10), Arc::new(PipelineStats::new()));
    assert_eq!(manager.apply_age_policy(at_ms(NOW_MS)).await.unwrap(), 0);
    let later = at_ms(NOW_MS) + Duration::milliseconds(1);
    assert_eq!(manager.apply_age_policy(later).await.unwrap(), 1);
}

#[tokio::test]
async fn test_count_policy_converges_oldest_first_in_batches() {
    let (_dir, store) = temp_store().await;
    let mut ids = Vec::new();
    for i in 0..12 {
        ids.push(store.persist(&sample_snapshot(NOW_MS + i * 1000)).await.unwrap());
    }

    let manager = RetentionManager::new(store.clone(), config(0, 5, 3), Arc::new(PipelineStats::new()));

    let first = manager.run_once_at(at_ms(NOW_MS)).await;
    assert_eq!(first.count_deleted, 3);
    assert_eq!(store.count_snapshots().await.unwrap(), 9);

    let mut rounds = 1;
    while store.count_snapshots().await.unwrap() > 5 {
        manager.run_once_at(at_ms(NOW_MS)).await;
        rounds += 1;
        assert!(rounds < 10, "count policy did not converge");
    }
    assert_eq!(rounds, 3);
    assert_eq!(store.select_oldest_ids(100).await.unwrap(), ids[7..].to_vec());

    let idle = manager.run_once_at(at_ms(NOW_MS)).await;
    assert_eq!(idle.total_deleted(), 0);
}

#[tokio::test]
async fn test_zero_limits_disable_both_policies() {
    let (_dir, store) = temp_store().await;
    for i in 0..4 {
        store.persist(&sample_snapshot(i * 1000)).await.unwrap();
    }
    let manager = RetentionManager::new(store.clone(), config(0, 0, 10), Arc::new(PipelineStats::new()));
    let report = manager.run_once_at(at_ms(NOW_MS)).await;
    assert_eq!(report.total_deleted(), 0);
    assert_eq!(store.count_snapshots().await.unwrap(), 4);
}

#[tokio::test]
async fn test_both_policies_in_one_tick() {
    let (_dir, store) = temp_store().await;
    // two stale, four fresh
    store.persist(&sample_snapshot(NOW_MS - 48 * HOUR_MS)).await.unwrap();
    store.persist(&sample_snapshot(NOW_MS - 47 * HOUR_MS)).await.unwrap();
    for i in 0..4 {
        store.persist(&sample_snapshot(NOW_MS - i * 1000)).await.unwrap();
    }

    let manager = RetentionManager::new(store.clone(), config(24 * 3600, 3, 10), Arc::new(PipelineStats::new()));
    let report = manager.run_once_at(at_ms(NOW_MS)).await;
    assert_eq!(report.age_deleted, 2);
    assert_eq!(report.count_deleted, 1);
    assert_eq!(store.count_snapshots().await.unwrap(), 3);

    let stats = store.retention_stats().await.unwrap();
    assert_eq!(stats.oldest.unwrap().timestamp_millis(), NOW_MS - 2000);
}
