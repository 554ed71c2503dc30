// ============================================================================
// Ingestion - stream messages into durable storage and the cache
// ============================================================================
//
// - pipeline  decode -> validate -> persist -> cache for one payload
// - consumer  the cancellable consume loop over any MessageSource
// - kafka     the production MessageSource
//
// ============================================================================

mod pipeline;
mod consumer;
mod kafka;

pub use pipeline::{IngestError, IngestOutcome, IngestionPipeline};
pub use consumer::{MessageSource, OrderConsumer, SourceError, SourceMessage};
pub use kafka::KafkaOrderSource;
