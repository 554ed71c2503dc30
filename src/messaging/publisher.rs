use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::producer::{FutureProducer, FutureRecord};

use crate::utils::{retry_on_transient, IsTransient, RetryConfig, RetryResult};

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Failed to create Kafka producer: {0}")]
    Client(#[source] KafkaError),

    #[error("Kafka send failed: {0}")]
    Send(#[source] KafkaError),
}

impl IsTransient for PublishError {
    fn is_transient(&self) -> bool {
        match self {
            PublishError::Client(_) => false,
            PublishError::Send(e) => matches!(
                e.rdkafka_error_code(),
                Some(
                    RDKafkaErrorCode::QueueFull
                        | RDKafkaErrorCode::MessageTimedOut
                        | RDKafkaErrorCode::RequestTimedOut
                        | RDKafkaErrorCode::BrokerTransportFailure
                        | RDKafkaErrorCode::AllBrokersDown
                        | RDKafkaErrorCode::NetworkException
                        | RDKafkaErrorCode::LeaderNotAvailable
                        | RDKafkaErrorCode::NotLeaderForPartition
                )
            ),
        }
    }
}

/// Kafka producer for order payloads.
pub struct OrderPublisher {
    producer: FutureProducer,
    retry_config: RetryConfig,
}

impl OrderPublisher {
    pub fn new(brokers: &str) -> Result<Self, PublishError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()
            .map_err(PublishError::Client)?;

        Ok(Self {
            producer,
            retry_config: RetryConfig::default(),
        })
    }

    /// Publish one payload keyed by `key`, retrying broker-side hiccups.
    pub async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), PublishError> {
        let result = retry_on_transient(self.retry_config.clone(), |_attempt| async move {
            let record = FutureRecord::to(topic).key(key).payload(payload);
            self.producer
                .send(record, Duration::from_secs(5))
                .await
                .map_err(|(e, _)| PublishError::Send(e))
        })
        .await;

        match result {
            RetryResult::Success(_) => {
                tracing::info!(topic = %topic, key = %key, size = payload.len(), "📤 Published order");
                Ok(())
            }
            RetryResult::Failed(e) | RetryResult::PermanentFailure(e) => {
                tracing::error!(topic = %topic, key = %key, error = %e, "Failed to publish order");
                Err(e)
            }
        }
    }
}
