use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::{Offset, TopicPartitionList};

use super::consumer::{MessageSource, SourceError, SourceMessage};

// ============================================================================
// Kafka Message Source
// ============================================================================
//
// Consumer-group reader with manual commits: the consume loop commits each
// offset after the pipeline is done with it. Auto-commit is off so a crash
// mid-message leads to redelivery instead of loss.
//
// ============================================================================

pub struct KafkaOrderSource {
    consumer: StreamConsumer,
}

impl KafkaOrderSource {
    pub fn new(brokers: &str, topic: &str, group_id: &str) -> anyhow::Result<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "6000")
            .set("enable.partition.eof", "false")
            .create()
            .map_err(|e| anyhow::anyhow!("Failed to create Kafka consumer: {}", e))?;

        consumer
            .subscribe(&[topic])
            .map_err(|e| anyhow::anyhow!("Failed to subscribe to {}: {}", topic, e))?;

        tracing::info!(
            brokers = %brokers,
            topic = %topic,
            group_id = %group_id,
            "Kafka consumer configured"
        );

        Ok(Self { consumer })
    }
}

#[async_trait]
impl MessageSource for KafkaOrderSource {
    async fn recv(&mut self, timeout: Duration) -> Result<Option<SourceMessage>, SourceError> {
        match tokio::time::timeout(timeout, self.consumer.recv()).await {
            Err(_elapsed) => Ok(None),
            Ok(Err(e)) => Err(SourceError::Read(e.to_string())),
            Ok(Ok(message)) => Ok(Some(SourceMessage {
                topic: message.topic().to_string(),
                partition: message.partition(),
                offset: message.offset(),
                payload: message.payload().map(<[u8]>::to_vec),
            })),
        }
    }

    async fn commit(&mut self, message: &SourceMessage) -> Result<(), SourceError> {
        let mut offsets = TopicPartitionList::new();
        offsets
            .add_partition_offset(&message.topic, message.partition, Offset::Offset(message.offset + 1))
            .map_err(|e| SourceError::Commit(e.to_string()))?;

        self.consumer
            .commit(&offsets, CommitMode::Async)
            .map_err(|e| SourceError::Commit(e.to_string()))
    }

    fn close(&mut self) {
        self.consumer.unsubscribe();
        tracing::info!("Kafka consumer closed");
    }
}
