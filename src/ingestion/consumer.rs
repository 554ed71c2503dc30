use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::pipeline::IngestionPipeline;

// ============================================================================
// Consume Loop
// ============================================================================
//
// A single task that reads one message at a time with a bounded wait and
// hands the payload to the pipeline. Every received message is committed
// after processing, dropped or not, so malformed messages are not
// redelivered. The loop only exits on cancellation, after which the source
// is closed.
//
// ============================================================================

/// One message read from the stream.
#[derive(Debug, Clone)]
pub struct SourceMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub payload: Option<Vec<u8>>,
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Failed to read message: {0}")]
    Read(String),

    #[error("Failed to commit offset: {0}")]
    Commit(String),
}

/// Stream transport consumed by [`OrderConsumer`].
#[async_trait]
pub trait MessageSource: Send {
    /// Wait up to `timeout` for the next message. `Ok(None)` means nothing
    /// arrived in time.
    async fn recv(&mut self, timeout: Duration) -> Result<Option<SourceMessage>, SourceError>;

    /// Mark a message as consumed.
    async fn commit(&mut self, message: &SourceMessage) -> Result<(), SourceError>;

    /// Release the underlying connection.
    fn close(&mut self);
}

pub struct OrderConsumer<S: MessageSource> {
    source: S,
    pipeline: Arc<IngestionPipeline>,
    poll_timeout: Duration,
    error_backoff: Duration,
}

impl<S: MessageSource> OrderConsumer<S> {
    pub fn new(
        source: S,
        pipeline: Arc<IngestionPipeline>,
        poll_timeout: Duration,
        error_backoff: Duration,
    ) -> Self {
        Self {
            source,
            pipeline,
            poll_timeout,
            error_backoff,
        }
    }

    /// Consume until `shutdown` is cancelled. Returns the closed source.
    pub async fn run(mut self, shutdown: CancellationToken) -> S {
        tracing::info!(
            poll_timeout_secs = self.poll_timeout.as_secs(),
            "Order consumer started. Waiting for messages..."
        );

        loop {
            let received = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                received = self.source.recv(self.poll_timeout) => received,
            };

            match received {
                Ok(Some(message)) => self.handle(message).await,
                Ok(None) => {
                    tracing::debug!(
                        timeout_secs = self.poll_timeout.as_secs(),
                        "No messages received (waiting...)"
                    );
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Error reading message, backing off");
                    tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.error_backoff) => {}
                    }
                }
            }
        }

        tracing::info!("Stopping order consumer");
        self.source.close();
        self.source
    }

    async fn handle(&mut self, message: SourceMessage) {
        tracing::debug!(
            topic = %message.topic,
            partition = message.partition,
            offset = message.offset,
            size = message.payload.as_ref().map_or(0, Vec::len),
            "Received new message"
        );

        let payload = message.payload.as_deref().unwrap_or_default();
        if let Err(e) = self.pipeline.process(payload).await {
            tracing::warn!(
                partition = message.partition,
                offset = message.offset,
                reason = e.reason(),
                "Message dropped"
            );
        }

        if let Err(e) = self.source.commit(&message).await {
            tracing::warn!(
                partition = message.partition,
                offset = message.offset,
                error = %e,
                "Failed to commit offset (message may be redelivered)"
            );
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
