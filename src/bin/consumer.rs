// snapshot-consumer: log → store, plus retention, until SIGINT/SIGTERM.

use anyhow::Result;
use cluster_snapshot::retention::RetentionManager;
use cluster_snapshot::stats::PipelineStats;
use cluster_snapshot::store::SnapshotStore;
use cluster_snapshot::subscriber::KafkaSubscriber;
use cluster_snapshot::{config, logging, shutdown, version};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    let app_config = config::AppConfig::load()?;
    logging::init(&app_config.logging);
    tracing::info!(version = %version::banner(), "starting snapshot consumer");

    let store =
        SnapshotStore::connect(&app_config.database.path, app_config.database.max_pool_size)
            .await?;
    store.init().await?;

    let stats = Arc::new(PipelineStats::new());
    let cancel = CancellationToken::new();
    let mut background = Vec::new();

    if app_config.retention.enabled {
        let manager = RetentionManager::new(
            store.clone(),
            app_config.retention.clone(),
            stats.clone(),
        );
        background.push(manager.spawn(cancel.clone()));
    } else {
        tracing::info!("retention disabled");
    }

    background.push(tokio::spawn({
        let stats = stats.clone();
        let cancel = cancel.clone();
        let every = Duration::from_secs(app_config.monitoring.stats_log_interval_secs);
        async move {
            let mut tick = tokio::time::interval(every);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            tick.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tick.tick() => stats.log(),
                }
            }
        }
    }));

    let mut subscriber = if app_config.kafka.enabled {
        let sub = KafkaSubscriber::new(&app_config.kafka, Arc::new(store.clone()), stats.clone())?;
        Some(tokio::spawn(sub.run(cancel.clone())))
    } else {
        tracing::warn!("kafka disabled; running retention only");
        None
    };

    let joined = tokio::select! {
        _ = shutdown::signal() => {
            tracing::info!("received shutdown signal");
            None
        }
        joined = async {
            match subscriber.as_mut() {
                Some(handle) => handle.await,
                None => std::future::pending().await,
            }
        } => Some(joined),
    };
    let failure = match joined {
        None => None,
        Some(joined) => {
            subscriber = None;
            match joined {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e),
                Err(e) => Some(anyhow::anyhow!("subscriber task: {}", e)),
            }
        }
    };
    cancel.cancel();

    if let Some(handle) = subscriber {
        match handle.await {
            Ok(Err(e)) => tracing::error!(error = %e, "subscriber stopped with error"),
            Err(e) => tracing::error!(error = %e, "subscriber task panicked"),
            Ok(Ok(())) => {}
        }
    }
    for handle in background {
        let _ = handle.await;
    }
    stats.log();

    if let Some(e) = failure {
        tracing::error!(error = %e, "subscriber failed");
        return Err(e);
    }
    Ok(())
}
