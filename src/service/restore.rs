use std::sync::Arc;

use crate::cache::OrderCache;
use crate::metrics::Metrics;
use crate::store::{OrderStore, StoreError};

// ============================================================================
// Startup Restorer - warm the cache from the store
// ============================================================================
//
// Runs once before the consumer starts. Skipped records and a failed fetch
// are both non-fatal: the lookup fallback fills whatever is missing.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreSummary {
    pub loaded: usize,
    pub skipped: usize,
}

pub struct StartupRestorer {
    cache: Arc<OrderCache>,
    store: Arc<dyn OrderStore>,
    metrics: Arc<Metrics>,
}

impl StartupRestorer {
    pub fn new(cache: Arc<OrderCache>, store: Arc<dyn OrderStore>, metrics: Arc<Metrics>) -> Self {
        Self { cache, store, metrics }
    }

    /// Load every stored order into the cache. Errors only when the fetch
    /// itself fails.
    pub async fn restore(&self) -> Result<RestoreSummary, StoreError> {
        tracing::info!("Restoring cache from database...");

        let report = self.store.fetch_all().await?;
        let summary = RestoreSummary {
            loaded: report.orders.len(),
            skipped: report.skipped.len(),
        };

        for order in report.orders {
            let order_uid = order.order_uid.clone();
            self.cache.set(&order_uid, order);
        }

        self.metrics.record_restore(summary.loaded, summary.skipped);
        self.metrics.set_cache_entries(self.cache.size());

        if summary.skipped > 0 {
            tracing::warn!(
                loaded = summary.loaded,
                skipped = summary.skipped,
                "Cache restored with gaps, skipped orders will be loaded on first read"
            );
        } else {
            tracing::info!(loaded = summary.loaded, "Cache restored");
        }

        Ok(summary)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{sample_order, MemoryOrderStore};

    fn restorer(store: Arc<MemoryOrderStore>, cache: Arc<OrderCache>) -> StartupRestorer {
        StartupRestorer::new(cache, store, Arc::new(Metrics::new().unwrap()))
    }

    #[tokio::test]
    async fn test_restore_loads_every_record() {
        let orders: Vec<_> = (1..=5).map(|i| sample_order(&format!("o-{i}"))).collect();
        let store = Arc::new(MemoryOrderStore::with_orders(orders.clone()));
        let cache = Arc::new(OrderCache::new());

        let summary = restorer(store, cache.clone()).restore().await.unwrap();

        assert_eq!(summary, RestoreSummary { loaded: 5, skipped: 0 });
        assert_eq!(cache.size(), 5);
        for order in orders {
            assert_eq!(cache.get(&order.order_uid), Some(order));
        }
    }

    #[tokio::test]
    async fn test_restore_reports_skipped_records() {
        let store = Arc::new(MemoryOrderStore::with_orders([sample_order("o-1")]));
        store.add_skipped("o-2", "missing payment row");
        let cache = Arc::new(OrderCache::new());

        let summary = restorer(store, cache.clone()).restore().await.unwrap();

        assert_eq!(summary, RestoreSummary { loaded: 1, skipped: 1 });
        assert_eq!(cache.size(), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_cache_empty() {
        let store = Arc::new(MemoryOrderStore::with_orders([sample_order("o-1")]));
        store.fail_fetch(true);
        let cache = Arc::new(OrderCache::new());

        assert!(restorer(store, cache.clone()).restore().await.is_err());
        assert_eq!(cache.size(), 0);
    }

    #[tokio::test]
    async fn test_restore_on_empty_store() {
        let store = Arc::new(MemoryOrderStore::new());
        let cache = Arc::new(OrderCache::new());

        let summary = restorer(store, cache.clone()).restore().await.unwrap();

        assert_eq!(summary.loaded, 0);
        assert_eq!(cache.size(), 0);
    }
}
