use std::sync::Arc;
use std::time::Instant;

use crate::cache::OrderCache;
use crate::domain::order::{decode_order, payload_preview, validate_order, OrderError};
use crate::metrics::Metrics;
use crate::store::{OrderStore, PersistOutcome, StoreError};

// ============================================================================
// Ingestion Pipeline - one stream message at a time
// ============================================================================
//
// Received -> Decoded -> Validated -> Persisted -> Cached
//
// A failure at any stage drops the message. The cache is written only after
// the store has committed, so anything visible through the cache is durable.
//
// ============================================================================

#[derive(Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Persisted and published to the cache.
    Cached { order_uid: String },
    /// The store already held this identifier; the cache was left untouched.
    AlreadyPersisted { order_uid: String },
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("decode failed: {0}")]
    Decode(#[source] OrderError),

    #[error("validation failed: {0}")]
    Validation(#[source] OrderError),

    #[error("persistence failed for {order_uid}: {source}")]
    Persistence {
        order_uid: String,
        #[source]
        source: StoreError,
    },
}

impl IngestError {
    /// Label used for the dropped-messages metric.
    pub fn reason(&self) -> &'static str {
        match self {
            IngestError::Decode(_) => "decode",
            IngestError::Validation(_) => "validation",
            IngestError::Persistence { .. } => "persistence",
        }
    }
}

pub struct IngestionPipeline {
    store: Arc<dyn OrderStore>,
    cache: Arc<OrderCache>,
    metrics: Arc<Metrics>,
}

impl IngestionPipeline {
    pub fn new(store: Arc<dyn OrderStore>, cache: Arc<OrderCache>, metrics: Arc<Metrics>) -> Self {
        Self { store, cache, metrics }
    }

    /// Run one payload through every stage and record the result.
    pub async fn process(&self, payload: &[u8]) -> Result<IngestOutcome, IngestError> {
        let started = Instant::now();
        let result = self.ingest(payload).await;
        let elapsed = started.elapsed().as_secs_f64();

        match &result {
            Ok(IngestOutcome::Cached { order_uid }) => {
                self.metrics.record_ingestion(elapsed, None);
                self.metrics.set_cache_entries(self.cache.size());
                tracing::info!(order_uid = %order_uid, "✅ Successfully processed order");
            }
            Ok(IngestOutcome::AlreadyPersisted { order_uid }) => {
                self.metrics.record_ingestion(elapsed, Some("duplicate"));
                tracing::info!(order_uid = %order_uid, "Duplicate delivery, order already stored");
            }
            Err(e) if matches!(e, IngestError::Persistence { .. }) => {
                self.metrics.record_ingestion(elapsed, Some(e.reason()));
                tracing::error!(error = %e, "❌ Dropping message, order not stored");
            }
            Err(e) => {
                self.metrics.record_ingestion(elapsed, Some(e.reason()));
                tracing::warn!(
                    error = %e,
                    payload = %payload_preview(payload),
                    "❌ Dropping invalid message"
                );
            }
        }

        result
    }

    async fn ingest(&self, payload: &[u8]) -> Result<IngestOutcome, IngestError> {
        let order = decode_order(payload).map_err(IngestError::Decode)?;
        validate_order(&order).map_err(IngestError::Validation)?;

        let outcome = self.store.persist_order(&order).await.map_err(|source| {
            IngestError::Persistence {
                order_uid: order.order_uid.clone(),
                source,
            }
        })?;

        match outcome {
            PersistOutcome::Inserted => {
                let order_uid = order.order_uid.clone();
                self.cache.set(&order_uid, order);
                Ok(IngestOutcome::Cached { order_uid })
            }
            PersistOutcome::AlreadyExists => Ok(IngestOutcome::AlreadyPersisted {
                order_uid: order.order_uid,
            }),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
