// Print stored snapshots as JSON.
//
// Usage: cargo run --example dump_snapshots -- [DB_PATH] [LIMIT] [KIND]
//   DB_PATH  default: ./data/snapshots.db
//   LIMIT    default: the store's listing cap
//   KIND     optional resource kind (e.g. pods); prints that kind's rows
//            from the latest snapshot instead of the snapshot list

use cluster_snapshot::models::ResourceKind;
use cluster_snapshot::store::SnapshotStore;
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let path = args.get(1).map(String::as_str).unwrap_or("./data/snapshots.db");
    let limit: Option<u32> = args.get(2).and_then(|s| s.parse().ok());

    let store = SnapshotStore::connect(path, 1).await?;

    if let Some(kind) = args.get(3) {
        let kind: ResourceKind = kind.parse()?;
        let Some(id) = store.latest_snapshot_id().await? else {
            println!("[]");
            return Ok(());
        };
        let rows = store.list_resources(kind, id, None, limit).await?;
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let summaries = store.list_snapshots(limit).await?;
    let stats = store.retention_stats().await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "retention": stats,
            "snapshots": summaries,
        }))?
    );
    Ok(())
}
