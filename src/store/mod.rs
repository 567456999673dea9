// SQLite snapshot store. One parent row per snapshot in cluster_snapshots, one
// child row per resource record in the kind tables; every write is one transaction.

mod blob;
mod kinds;
mod schema;

use crate::error::StoreError;
use crate::models::{ResourceCounts, ResourceKind, Snapshot, SnapshotId};
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

/// Cap applied by [`SnapshotStore::list_resources`] when the caller passes none.
pub const DEFAULT_RESOURCE_LIMIT: u32 = 1000;

/// Cap applied by [`SnapshotStore::list_snapshots`] when the caller passes none.
pub const DEFAULT_SNAPSHOT_LIMIT: u32 = 50;

/// Parent row with per-kind record counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotSummary {
    pub id: SnapshotId,
    pub captured_at: DateTime<Utc>,
    pub counts: ResourceCounts,
}

/// Parent row plus the full snapshot decoded from its blob.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredSnapshot {
    pub id: SnapshotId,
    pub captured_at: DateTime<Utc>,
    pub snapshot: Snapshot,
}

/// One child row. `data` is the record as stored, decoded to JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceRow {
    pub id: i64,
    pub snapshot_id: SnapshotId,
    pub kind: ResourceKind,
    pub name: String,
    pub namespace: Option<String>,
    pub created_time: Option<DateTime<Utc>>,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RetentionStats {
    pub total_snapshots: i64,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct SnapshotStore {
    pool: SqlitePool,
}

fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

impl SnapshotStore {
    pub async fn connect(path: &str, max_pool_size: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    /// Create tables and indexes if missing and record the schema version.
    pub async fn init(&self) -> anyhow::Result<()> {
        for stmt in schema::SCHEMA {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        sqlx::query("INSERT OR REPLACE INTO schema_version (key, value) VALUES ('schema', $1)")
            .bind(schema::SCHEMA_VERSION)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Write the parent row and every child row in one transaction; returns the new id.
    /// Any failure rolls back the whole snapshot.
    #[instrument(skip(self, snapshot), fields(repo = "snapshots", operation = "persist", captured_at = snapshot.timestamp_ms()))]
    pub async fn persist(&self, snapshot: &Snapshot) -> Result<SnapshotId, StoreError> {
        let parent_blob =
            blob::encode(snapshot).map_err(|e| StoreError::encode("snapshot", e))?;

        let mut tx = self.pool.begin().await?;
        let snapshot_id = sqlx::query("INSERT INTO cluster_snapshots (captured_at, data) VALUES ($1, $2)")
            .bind(snapshot.timestamp_ms())
            .bind(&parent_blob)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        kinds::insert_all(&mut *tx, snapshot_id, snapshot).await?;
        tx.commit().await?;

        let counts = snapshot.counts();
        tracing::info!(
            snapshot_id,
            deployments = counts.deployments,
            pods = counts.pods,
            nodes = counts.nodes,
            services = counts.services,
            ingresses = counts.ingresses,
            configmaps = counts.configmaps,
            secrets = counts.secrets,
            persistent_volumes = counts.persistent_volumes,
            persistent_volume_claims = counts.persistent_volume_claims,
            "snapshot persisted"
        );
        Ok(snapshot_id)
    }

    /// Most recent snapshots first; `limit` defaults to [`DEFAULT_SNAPSHOT_LIMIT`].
    #[instrument(skip(self), fields(repo = "snapshots", operation = "list_snapshots"))]
    pub async fn list_snapshots(&self, limit: Option<u32>) -> Result<Vec<SnapshotSummary>, StoreError> {
        let limit = limit.unwrap_or(DEFAULT_SNAPSHOT_LIMIT) as i64;
        let rows = sqlx::query(kinds::SELECT_SNAPSHOT_SUMMARIES)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let mut counts = ResourceCounts::default();
            for kind in ResourceKind::ALL {
                counts.set(kind, row.try_get(kind.as_str())?);
            }
            let captured_at: i64 = row.try_get("captured_at")?;
            out.push(SnapshotSummary {
                id: row.try_get("id")?,
                captured_at: from_millis(captured_at).unwrap_or_default(),
                counts,
            });
        }
        Ok(out)
    }

    #[instrument(skip(self), fields(repo = "snapshots", operation = "get_snapshot"))]
    pub async fn get_snapshot(&self, id: SnapshotId) -> Result<Option<StoredSnapshot>, StoreError> {
        let row = sqlx::query("SELECT id, captured_at, data FROM cluster_snapshots WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let captured_at: i64 = row.try_get("captured_at")?;
        let data: Vec<u8> = row.try_get("data")?;
        let snapshot = blob::decode(&data).map_err(|source| StoreError::Decode { id, source })?;
        Ok(Some(StoredSnapshot {
            id,
            captured_at: from_millis(captured_at).unwrap_or_default(),
            snapshot,
        }))
    }

    pub async fn latest_snapshot_id(&self) -> Result<Option<SnapshotId>, StoreError> {
        let id = sqlx::query_scalar::<_, SnapshotId>(
            "SELECT id FROM cluster_snapshots ORDER BY captured_at DESC, id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    /// Child rows of one kind for one snapshot, newest resources first. `namespace` is
    /// ignored for cluster-scoped kinds; `limit` defaults to [`DEFAULT_RESOURCE_LIMIT`].
    #[instrument(skip(self), fields(repo = "snapshots", operation = "list_resources"))]
    pub async fn list_resources(
        &self,
        kind: ResourceKind,
        snapshot_id: SnapshotId,
        namespace: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<ResourceRow>, StoreError> {
        let q = kinds::queries(kind);
        let limit = limit.unwrap_or(DEFAULT_RESOURCE_LIMIT) as i64;
        let rows = match (namespace, q.select_in_namespace) {
            (Some(ns), Some(sql)) => {
                sqlx::query(sql)
                    .bind(snapshot_id)
                    .bind(ns)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
            _ => {
                sqlx::query(q.select)
                    .bind(snapshot_id)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        rows.iter()
            .map(|row| Self::parse_resource_row(kind, row))
            .collect()
    }

    pub async fn count_resources(
        &self,
        kind: ResourceKind,
        snapshot_id: SnapshotId,
    ) -> Result<i64, StoreError> {
        let n = sqlx::query_scalar::<_, i64>(kinds::queries(kind).count)
            .bind(snapshot_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    pub async fn retention_stats(&self) -> Result<RetentionStats, StoreError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total, MIN(captured_at) AS oldest, MAX(captured_at) AS newest FROM cluster_snapshots",
        )
        .fetch_one(&self.pool)
        .await?;
        let oldest: Option<i64> = row.try_get("oldest")?;
        let newest: Option<i64> = row.try_get("newest")?;
        Ok(RetentionStats {
            total_snapshots: row.try_get("total")?,
            oldest: oldest.and_then(from_millis),
            newest: newest.and_then(from_millis),
        })
    }

    pub async fn count_snapshots(&self) -> Result<i64, StoreError> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM cluster_snapshots")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    /// Ids captured strictly before `cutoff_ms`, oldest first.
    pub async fn select_ids_older_than(
        &self,
        cutoff_ms: i64,
        limit: u32,
    ) -> Result<Vec<SnapshotId>, StoreError> {
        let ids = sqlx::query_scalar::<_, SnapshotId>(
            "SELECT id FROM cluster_snapshots WHERE captured_at < $1 ORDER BY captured_at ASC, id ASC LIMIT $2",
        )
        .bind(cutoff_ms)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    pub async fn select_oldest_ids(&self, limit: u32) -> Result<Vec<SnapshotId>, StoreError> {
        let ids = sqlx::query_scalar::<_, SnapshotId>(
            "SELECT id FROM cluster_snapshots ORDER BY captured_at ASC, id ASC LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// Delete snapshots and their child rows in one transaction, child tables first.
    /// Ids that no longer exist are skipped. Returns the number of parent rows removed.
    #[instrument(skip(self, ids), fields(repo = "snapshots", operation = "delete_snapshots", batch = ids.len()))]
    pub async fn delete_snapshots(&self, ids: &[SnapshotId]) -> Result<u64, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let id_list = serde_json::to_string(ids).map_err(|e| StoreError::encode("snapshot ids", e))?;

        let mut tx = self.pool.begin().await?;
        for kind in kinds::DELETE_ORDER {
            sqlx::query(kinds::queries(kind).delete_batch)
                .bind(&id_list)
                .execute(&mut *tx)
                .await?;
        }
        let r = sqlx::query("DELETE FROM cluster_snapshots WHERE id IN (SELECT value FROM json_each($1))")
            .bind(&id_list)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(r.rows_affected())
    }

    /// Reclaim space after deletes.
    #[instrument(skip(self), fields(repo = "snapshots", operation = "vacuum"))]
    pub async fn vacuum(&self) -> Result<(), StoreError> {
        sqlx::query("VACUUM").execute(&self.pool).await?;
        Ok(())
    }

    fn parse_resource_row(kind: ResourceKind, row: &SqliteRow) -> Result<ResourceRow, StoreError> {
        let snapshot_id: SnapshotId = row.try_get("snapshot_id")?;
        let created_time: Option<i64> = row.try_get("created_time")?;
        let data: Vec<u8> = row.try_get("data")?;
        let data = blob::decode(&data).map_err(|source| StoreError::Decode {
            id: snapshot_id,
            source,
        })?;
        Ok(ResourceRow {
            id: row.try_get("id")?,
            snapshot_id,
            kind,
            name: row.try_get("name")?,
            namespace: row.try_get("namespace")?,
            created_time: created_time.and_then(from_millis),
            data,
        })
    }
}
