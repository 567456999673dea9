// Kafka consume loop. Messages fan out to one worker task per partition; offsets
// are stored by the workers and committed by librdkafka's auto-commit.

use super::{InboundMessage, OffsetMarker, PartitionWorker, SnapshotSink, backoff_delay};
use crate::config::KafkaConfig;
use crate::stats::PipelineStats;
use anyhow::Context;
use rdkafka::config::RDKafkaLogLevel;
use rdkafka::consumer::{CommitMode, Consumer, ConsumerContext, StreamConsumer};
use rdkafka::error::KafkaResult;
use rdkafka::{ClientConfig, ClientContext, Message, TopicPartitionList};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

pub struct SubscriberContext;

impl ClientContext for SubscriberContext {}

impl ConsumerContext for SubscriberContext {
    fn commit_callback(&self, result: KafkaResult<()>, _offsets: &TopicPartitionList) {
        if let Err(e) = result {
            tracing::warn!(error = %e, "offset commit failed");
        }
    }
}

type SnapshotConsumer = StreamConsumer<SubscriberContext>;

/// Group consumer settings. Offsets are stored explicitly after each message and
/// committed in the background; a new group starts from the oldest message.
pub fn consumer_config(config: &KafkaConfig) -> ClientConfig {
    let mut client = ClientConfig::new();
    client
        .set("bootstrap.servers", config.brokers.join(","))
        .set("group.id", &config.group_id)
        .set("enable.auto.commit", "true")
        .set("enable.auto.offset.store", "false")
        .set("auto.offset.reset", "earliest")
        .set("partition.assignment.strategy", "roundrobin")
        .set("session.timeout.ms", config.session_timeout_ms.to_string())
        .set("heartbeat.interval.ms", config.heartbeat_interval_ms.to_string())
        .set_log_level(RDKafkaLogLevel::Warning);
    client
}

struct KafkaOffsets {
    consumer: Arc<SnapshotConsumer>,
    topic: String,
}

impl OffsetMarker for KafkaOffsets {
    fn mark(&self, partition: i32, offset: i64) -> anyhow::Result<()> {
        // the stored offset is the next one to read
        self.consumer
            .store_offset(&self.topic, partition, offset + 1)
            .with_context(|| format!("storing offset {} for partition {}", offset + 1, partition))
    }
}

pub struct KafkaSubscriber {
    consumer: Arc<SnapshotConsumer>,
    topic: String,
    sink: Arc<dyn SnapshotSink>,
    stats: Arc<PipelineStats>,
    queue_capacity: usize,
    backoff_initial: Duration,
    backoff_max: Duration,
}

impl KafkaSubscriber {
    pub fn new(
        config: &KafkaConfig,
        sink: Arc<dyn SnapshotSink>,
        stats: Arc<PipelineStats>,
    ) -> anyhow::Result<Self> {
        let consumer: SnapshotConsumer = consumer_config(config)
            .create_with_context(SubscriberContext)
            .context("creating kafka consumer")?;
        Ok(Self {
            consumer: Arc::new(consumer),
            topic: config.topic.clone(),
            sink,
            stats,
            queue_capacity: config.partition_queue_capacity,
            backoff_initial: Duration::from_millis(config.consume_backoff_initial_ms),
            backoff_max: Duration::from_millis(config.consume_backoff_max_ms),
        })
    }

    /// Consume until `cancel` fires. Broker errors never end the loop; they are
    /// retried after an exponential backoff.
    pub async fn run(self, cancel: CancellationToken) -> anyhow::Result<()> {
        self.consumer
            .subscribe(&[self.topic.as_str()])
            .with_context(|| format!("subscribing to {}", self.topic))?;
        tracing::info!(topic = %self.topic, "subscriber started");

        let marker: Arc<dyn OffsetMarker> = Arc::new(KafkaOffsets {
            consumer: self.consumer.clone(),
            topic: self.topic.clone(),
        });
        let mut queues: HashMap<i32, mpsc::Sender<InboundMessage>> = HashMap::new();
        let mut workers = JoinSet::new();
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                break;
            }
            let received = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                m = self.consumer.recv() => m.map(|m| InboundMessage {
                    partition: m.partition(),
                    offset: m.offset(),
                    payload: m.payload().map(<[u8]>::to_vec),
                    timestamp_ms: m.timestamp().to_millis(),
                }),
            };

            let msg = match received {
                Ok(msg) => {
                    attempt = 0;
                    msg
                }
                Err(e) => {
                    PipelineStats::incr(&self.stats.consume_errors, 1);
                    let delay = backoff_delay(attempt, self.backoff_initial, self.backoff_max);
                    attempt = attempt.saturating_add(1);
                    tracing::warn!(error = %e, attempt, delay_ms = delay.as_millis() as u64, "consume failed, backing off");
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(delay) => continue,
                    }
                }
            };

            let partition = msg.partition;
            let queue = queues.entry(partition).or_insert_with(|| {
                let (tx, rx) = mpsc::channel(self.queue_capacity);
                let worker = PartitionWorker::new(
                    partition,
                    self.sink.clone(),
                    marker.clone(),
                    self.stats.clone(),
                );
                workers.spawn(worker.run(rx, cancel.clone()));
                tx
            });

            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                r = queue.send(msg) => r.is_ok(),
            };
            if !sent {
                tracing::error!(partition, "partition worker gone, message dropped");
                queues.remove(&partition);
            }
        }

        drop(queues);
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "partition worker panicked");
            }
        }
        if let Err(e) = self.consumer.commit_consumer_state(CommitMode::Sync) {
            tracing::debug!(error = %e, "final offset commit skipped");
        }
        tracing::info!(topic = %self.topic, "subscriber stopped");
        Ok(())
    }
}
