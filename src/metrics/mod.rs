// Private module declaration
mod server;

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};

// Re-export for public API
pub use server::metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Ingestion throughput, latency and dropped messages by reason
// - Cache lookups (hit / miss / fallback outcome) and cache size
// - Startup restore coverage
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

/// Central metrics registry for the entire application
pub struct Metrics {
    registry: Registry,

    // Ingestion Metrics
    pub orders_ingested: IntCounter,
    pub messages_dropped: IntCounterVec,
    pub ingestion_duration: Histogram,

    // Cache Metrics
    pub cache_lookups: IntCounterVec,
    pub cache_entries: IntGauge,

    // Restore Metrics
    pub restore_loaded: IntGauge,
    pub restore_skipped: IntGauge,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        // Ingestion Metrics
        let orders_ingested = IntCounter::new(
            "orders_ingested_total",
            "Orders persisted and published to the cache",
        )?;
        registry.register(Box::new(orders_ingested.clone()))?;

        let messages_dropped = IntCounterVec::new(
            Opts::new("messages_dropped_total", "Stream messages dropped without caching"),
            &["reason"],
        )?;
        registry.register(Box::new(messages_dropped.clone()))?;

        let ingestion_duration = Histogram::with_opts(
            HistogramOpts::new("ingestion_duration_seconds", "Time to process one stream message")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )?;
        registry.register(Box::new(ingestion_duration.clone()))?;

        // Cache Metrics
        let cache_lookups = IntCounterVec::new(
            Opts::new("cache_lookups_total", "Order lookups by outcome"),
            &["result"],
        )?;
        registry.register(Box::new(cache_lookups.clone()))?;

        let cache_entries = IntGauge::new("cache_entries", "Orders currently cached")?;
        registry.register(Box::new(cache_entries.clone()))?;

        // Restore Metrics
        let restore_loaded = IntGauge::new(
            "restore_orders_loaded",
            "Orders loaded into the cache by the last startup restore",
        )?;
        registry.register(Box::new(restore_loaded.clone()))?;

        let restore_skipped = IntGauge::new(
            "restore_orders_skipped",
            "Stored orders the last startup restore could not reconstruct",
        )?;
        registry.register(Box::new(restore_skipped.clone()))?;

        Ok(Self {
            registry,
            orders_ingested,
            messages_dropped,
            ingestion_duration,
            cache_lookups,
            cache_entries,
            restore_loaded,
            restore_skipped,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Helper to record one processed stream message
    pub fn record_ingestion(&self, duration_secs: f64, dropped_reason: Option<&str>) {
        match dropped_reason {
            None => self.orders_ingested.inc(),
            Some(reason) => self.messages_dropped.with_label_values(&[reason]).inc(),
        }
        self.ingestion_duration.observe(duration_secs);
    }

    /// Helper to record a lookup outcome
    pub fn record_lookup(&self, result: &str) {
        self.cache_lookups.with_label_values(&[result]).inc();
    }

    pub fn set_cache_entries(&self, entries: usize) {
        self.cache_entries.set(entries as i64);
    }

    pub fn record_restore(&self, loaded: usize, skipped: usize) {
        self.restore_loaded.set(loaded as i64);
        self.restore_skipped.set(skipped as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert!(!metrics.registry.gather().is_empty());
    }

    #[test]
    fn test_record_ingestion() {
        let metrics = Metrics::new().unwrap();
        metrics.record_ingestion(0.01, None);
        metrics.record_ingestion(0.02, Some("validation"));
        metrics.record_ingestion(0.03, Some("validation"));

        assert_eq!(metrics.orders_ingested.get(), 1);
        assert_eq!(metrics.messages_dropped.with_label_values(&["validation"]).get(), 2);
        assert_eq!(metrics.ingestion_duration.get_sample_count(), 3);
    }

    #[test]
    fn test_record_lookup() {
        let metrics = Metrics::new().unwrap();
        metrics.record_lookup("hit");
        metrics.record_lookup("miss");
        metrics.record_lookup("hit");

        let gathered = metrics.registry.gather();
        let lookups = gathered.iter().find(|m| m.name() == "cache_lookups_total").unwrap();
        assert_eq!(lookups.metric.len(), 2); // Two different result labels
    }

    #[test]
    fn test_record_restore() {
        let metrics = Metrics::new().unwrap();
        metrics.record_restore(10, 2);

        assert_eq!(metrics.restore_loaded.get(), 10);
        assert_eq!(metrics.restore_skipped.get(), 2);
    }
}
