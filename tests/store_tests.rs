// SnapshotStore tests against a temporary SQLite file

mod common;

use cluster_snapshot::error::StoreError;
use cluster_snapshot::models::{ResourceKind, SecretInfo, Snapshot};
use cluster_snapshot::store::{DEFAULT_SNAPSHOT_LIMIT, SnapshotStore};
use common::{at_ms, sample_snapshot, temp_store};
use tempfile::TempDir;

#[tokio::test]
async fn test_init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("snapshots.db");
    let store = SnapshotStore::connect(path.to_str().unwrap(), 2)
        .await
        .unwrap();
    store.init().await.unwrap();
    store.init().await.unwrap();
    assert!(path.exists());
    assert_eq!(store.count_snapshots().await.unwrap(), 0);
    assert!(store.latest_snapshot_id().await.unwrap().is_none());
}

#[tokio::test]
async fn test_persist_writes_child_rows_for_every_kind() {
    let (_dir, store) = temp_store().await;
    let snapshot = sample_snapshot(1_700_000_000_000);

    let id = store.persist(&snapshot).await.unwrap();
    for kind in ResourceKind::ALL {
        assert_eq!(
            store.count_resources(kind, id).await.unwrap(),
            snapshot.count(kind) as i64,
            "{}",
            kind
        );
    }

    let summaries = store.list_snapshots(Some(10)).await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].id, id);
    assert_eq!(summaries[0].counts, snapshot.counts());
    assert_eq!(summaries[0].captured_at, snapshot.timestamp);
}

#[tokio::test]
async fn test_get_snapshot_returns_what_was_persisted() {
    let (_dir, store) = temp_store().await;
    let snapshot = sample_snapshot(1_700_000_000_000);
    let id = store.persist(&snapshot).await.unwrap();

    let stored = store.get_snapshot(id).await.unwrap().expect("stored");
    assert_eq!(stored.id, id);
    assert_eq!(stored.snapshot, snapshot);
    assert!(store.get_snapshot(id + 100).await.unwrap().is_none());
}

#[tokio::test]
async fn test_ids_increase_and_listing_is_newest_first() {
    let (_dir, store) = temp_store().await;
    let a = store.persist(&sample_snapshot(1_000_000)).await.unwrap();
    let b = store.persist(&sample_snapshot(2_000_000)).await.unwrap();
    let c = store.persist(&sample_snapshot(3_000_000)).await.unwrap();
    assert!(a < b && b < c);

    let ids: Vec<_> = store
        .list_snapshots(Some(2))
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(ids, vec![c, b]);
    assert_eq!(store.latest_snapshot_id().await.unwrap(), Some(c));
}

#[tokio::test]
async fn test_list_snapshots_without_limit_uses_default_cap() {
    let (_dir, store) = temp_store().await;
    let total = DEFAULT_SNAPSHOT_LIMIT as i64 + 3;
    for i in 0..total {
        store.persist(&Snapshot::empty(at_ms(i * 1000))).await.unwrap();
    }

    let summaries = store.list_snapshots(None).await.unwrap();
    assert_eq!(summaries.len(), DEFAULT_SNAPSHOT_LIMIT as usize);
    assert_eq!(summaries[0].captured_at.timestamp_millis(), (total - 1) * 1000);
    assert_eq!(summaries[0].counts.total(), 0);
}

#[tokio::test]
async fn test_failed_child_insert_rolls_back_whole_snapshot() {
    let (_dir, store) = temp_store().await;
    sqlx::query(
        "CREATE TRIGGER fail_secret BEFORE INSERT ON secrets WHEN NEW.name = 'boom' \
         BEGIN SELECT RAISE(ABORT, 'boom'); END",
    )
    .execute(store.pool())
    .await
    .unwrap();

    let mut snapshot = sample_snapshot(1_700_000_000_000);
    snapshot.secrets.push(SecretInfo {
        name: "boom".into(),
        namespace: "default".into(),
        type_: "Opaque".into(),
        ..Default::default()
    });

    let err = store.persist(&snapshot).await.unwrap_err();
    assert!(matches!(err, StoreError::Database(_)));
    assert_eq!(store.count_snapshots().await.unwrap(), 0);
    for kind in ResourceKind::ALL {
        let table_rows: i64 =
            sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", kind.as_str()))
                .fetch_one(store.pool())
                .await
                .unwrap();
        assert_eq!(table_rows, 0, "{} rows left behind", kind);
    }
}

#[tokio::test]
async fn test_list_resources_filters_by_namespace() {
    let (_dir, store) = temp_store().await;
    let id = store.persist(&sample_snapshot(1_700_000_000_000)).await.unwrap();

    let all = store
        .list_resources(ResourceKind::Pods, id, None, None)
        .await
        .unwrap();
    assert_eq!(all.len(), 3);

    let monitoring = store
        .list_resources(ResourceKind::Pods, id, Some("monitoring"), None)
        .await
        .unwrap();
    assert_eq!(monitoring.len(), 1);
    assert_eq!(monitoring[0].name, "metrics-5c4b-x");
    assert_eq!(monitoring[0].namespace.as_deref(), Some("monitoring"));
    assert_eq!(monitoring[0].data["deployment_name"], "metrics");

    let limited = store
        .list_resources(ResourceKind::Pods, id, None, Some(2))
        .await
        .unwrap();
    assert_eq!(limited.len(), 2);
}

#[tokio::test]
async fn test_cluster_scoped_kinds_ignore_namespace() {
    let (_dir, store) = temp_store().await;
    let id = store.persist(&sample_snapshot(1_700_000_000_000)).await.unwrap();

    let nodes = store
        .list_resources(ResourceKind::Nodes, id, Some("default"), None)
        .await
        .unwrap();
    assert_eq!(nodes.len(), 2);
    assert!(nodes.iter().all(|n| n.namespace.is_none()));
    assert!(nodes.iter().all(|n| n.kind == ResourceKind::Nodes));
}

#[tokio::test]
async fn test_stored_secret_rows_hold_no_values() {
    let (_dir, store) = temp_store().await;
    let id = store.persist(&sample_snapshot(1_700_000_000_000)).await.unwrap();

    let secrets = store
        .list_resources(ResourceKind::Secrets, id, None, None)
        .await
        .unwrap();
    assert_eq!(secrets.len(), 1);
    let data = secrets[0].data.as_object().unwrap();
    assert!(data.contains_key("data_keys"));
    assert!(!data.contains_key("data"));
}

#[tokio::test]
async fn test_delete_snapshots_removes_children() {
    let (_dir, store) = temp_store().await;
    let keep = store.persist(&sample_snapshot(1_000_000)).await.unwrap();
    let drop_a = store.persist(&sample_snapshot(2_000_000)).await.unwrap();
    let drop_b = store.persist(&sample_snapshot(3_000_000)).await.unwrap();

    let deleted = store.delete_snapshots(&[drop_a, drop_b]).await.unwrap();
    assert_eq!(deleted, 2);
    assert_eq!(store.count_snapshots().await.unwrap(), 1);
    for kind in ResourceKind::ALL {
        assert_eq!(store.count_resources(kind, drop_a).await.unwrap(), 0);
        assert_eq!(store.count_resources(kind, drop_b).await.unwrap(), 0);
    }
    assert_eq!(store.count_resources(ResourceKind::Pods, keep).await.unwrap(), 3);
}

#[tokio::test]
async fn test_delete_snapshots_skips_missing_ids() {
    let (_dir, store) = temp_store().await;
    let id = store.persist(&sample_snapshot(1_000_000)).await.unwrap();

    assert_eq!(store.delete_snapshots(&[]).await.unwrap(), 0);
    assert_eq!(store.delete_snapshots(&[id + 1, id + 2]).await.unwrap(), 0);
    assert_eq!(store.delete_snapshots(&[id, id + 1]).await.unwrap(), 1);
    assert_eq!(store.count_snapshots().await.unwrap(), 0);
}

#[tokio::test]
async fn test_retention_stats_and_selectors() {
    let (_dir, store) = temp_store().await;
    let empty = store.retention_stats().await.unwrap();
    assert_eq!(empty.total_snapshots, 0);
    assert!(empty.oldest.is_none());

    let a = store.persist(&sample_snapshot(1_000_000)).await.unwrap();
    let b = store.persist(&sample_snapshot(2_000_000)).await.unwrap();
    let _c = store.persist(&sample_snapshot(3_000_000)).await.unwrap();

    let stats = store.retention_stats().await.unwrap();
    assert_eq!(stats.total_snapshots, 3);
    assert_eq!(stats.oldest.unwrap().timestamp_millis(), 1_000_000);
    assert_eq!(stats.newest.unwrap().timestamp_millis(), 3_000_000);

    assert_eq!(store.select_ids_older_than(2_000_000, 10).await.unwrap(), vec![a]);
    assert_eq!(store.select_ids_older_than(2_000_001, 10).await.unwrap(), vec![a, b]);
    assert_eq!(store.select_oldest_ids(2).await.unwrap(), vec![a, b]);
}

#[tokio::test]
async fn test_vacuum_after_delete() {
    let (_dir, store) = temp_store().await;
    let id = store.persist(&sample_snapshot(1_000_000)).await.unwrap();
    store.delete_snapshots(&[id]).await.unwrap();
    store.vacuum().await.unwrap();
    assert_eq!(store.count_snapshots().await.unwrap(), 0);
}
