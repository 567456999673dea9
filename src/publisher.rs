// Snapshot publisher: one JSON message per collection cycle.

use crate::config::KafkaConfig;
use crate::error::PublishError;
use crate::models::Snapshot;
use anyhow::Context;
use rdkafka::ClientConfig;
use rdkafka::config::RDKafkaLogLevel;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer, PurgeConfig};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Where the broker stored the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishAck {
    pub partition: i32,
    pub offset: i64,
}

/// Durable producer settings: every in-sync replica must acknowledge.
pub fn producer_config(config: &KafkaConfig) -> ClientConfig {
    let mut client = ClientConfig::new();
    client
        .set("bootstrap.servers", config.brokers.join(","))
        .set("acks", "all")
        .set("message.send.max.retries", config.send_retries.to_string())
        .set("compression.type", &config.compression)
        .set_log_level(RDKafkaLogLevel::Warning);
    client
}

/// The record for one snapshot: capture time as the message timestamp, no key.
pub(crate) fn snapshot_record<'a>(
    topic: &'a str,
    partition: Option<i32>,
    snapshot: &Snapshot,
    payload: &'a [u8],
) -> FutureRecord<'a, (), [u8]> {
    let mut record = FutureRecord::to(topic)
        .payload(payload)
        .timestamp(snapshot.timestamp_ms());
    if let Some(partition) = partition {
        record = record.partition(partition);
    }
    record
}

pub struct Publisher {
    producer: FutureProducer,
    topic: String,
    partition: Option<i32>,
}

impl Publisher {
    pub fn new(config: &KafkaConfig) -> anyhow::Result<Self> {
        let producer: FutureProducer = producer_config(config)
            .create()
            .context("creating kafka producer")?;
        Ok(Self {
            producer,
            topic: config.topic.clone(),
            partition: config.partition,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Send `snapshot` and wait for the broker acknowledgment. The message timestamp
    /// is the capture time. No local buffering: a failure here ends the cycle.
    pub async fn publish(
        &self,
        snapshot: &Snapshot,
        cancel: &CancellationToken,
    ) -> Result<PublishAck, PublishError> {
        let payload = serde_json::to_vec(snapshot)?;
        let record = snapshot_record(&self.topic, self.partition, snapshot, &payload);

        let delivery = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PublishError::Cancelled),
            r = self.producer.send(record, Duration::from_secs(0)) => r,
        };

        match delivery {
            Ok((partition, offset)) => {
                tracing::info!(
                    topic = %self.topic,
                    partition,
                    offset,
                    bytes = payload.len(),
                    "snapshot published"
                );
                Ok(PublishAck { partition, offset })
            }
            Err((source, _message)) => Err(PublishError::Send {
                topic: self.topic.clone(),
                source,
            }),
        }
    }

    /// Wait for outstanding deliveries before the process exits.
    pub fn flush(&self, timeout: Duration) {
        if let Err(e) = self.producer.flush(timeout) {
            tracing::warn!(error = %e, "producer flush failed");
        }
    }

    /// Drop queued and in-flight messages so an abandoned publish is never delivered.
    pub fn discard_pending(&self) {
        self.producer
            .purge(PurgeConfig::default().queue().inflight());
        tracing::info!(topic = %self.topic, "pending messages discarded");
    }
}
