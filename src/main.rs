// snapshot-collector: one collection cycle, then exit. Non-zero exit on failure.

use anyhow::Result;
use cluster_snapshot::collector::{Collector, KubeClusterApi};
use cluster_snapshot::cycle::{self, SnapshotOutput};
use cluster_snapshot::publisher::Publisher;
use cluster_snapshot::store::SnapshotStore;
use cluster_snapshot::{config, logging, shutdown, version};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    let app_config = config::AppConfig::load()?;
    logging::init(&app_config.logging);
    tracing::info!(version = %version::banner(), "starting snapshot collector");

    let api = KubeClusterApi::connect(&app_config.kubernetes).await?;
    api.check_connection().await?;
    let collector = Collector::new(Arc::new(api));

    let output = if app_config.kafka.enabled {
        let publisher = Publisher::new(&app_config.kafka)?;
        tracing::info!(topic = publisher.topic(), "publishing to kafka");
        SnapshotOutput::Log(publisher)
    } else {
        let store =
            SnapshotStore::connect(&app_config.database.path, app_config.database.max_pool_size)
                .await?;
        store.init().await?;
        SnapshotOutput::Database(store)
    };
    tracing::info!(output = output.describe(), "snapshot output selected");

    let cancel = CancellationToken::new();
    shutdown::cancel_on_signal(cancel.clone());

    let result = cycle::run_once(&collector, &output, &cancel).await;
    if let SnapshotOutput::Log(publisher) = &output {
        // a cancelled publish was reported as failed; it must not land later
        match &result {
            Err(e) if e.is_cancelled() => publisher.discard_pending(),
            _ => publisher.flush(Duration::from_secs(10)),
        }
    }

    if let Err(e) = result {
        tracing::error!(error = %e, "collection cycle failed");
        return Err(e.into());
    }
    Ok(())
}
