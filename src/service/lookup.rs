use std::sync::Arc;

use crate::cache::OrderCache;
use crate::domain::order::Order;
use crate::metrics::Metrics;
use crate::store::OrderStore;

// ============================================================================
// Lookup Service - cache-aside reads
// ============================================================================
//
// 1. Serve from the cache when present (no store access).
// 2. On a miss, read the order from the store.
// 3. Put what the store returned into the cache before answering.
//
// Only store-backed data is ever written to the cache here.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Order not found: {0}")]
    NotFound(String),
}

pub struct LookupService {
    cache: Arc<OrderCache>,
    store: Arc<dyn OrderStore>,
    metrics: Arc<Metrics>,
}

impl LookupService {
    pub fn new(cache: Arc<OrderCache>, store: Arc<dyn OrderStore>, metrics: Arc<Metrics>) -> Self {
        Self { cache, store, metrics }
    }

    pub async fn get_order(&self, order_uid: &str) -> Result<Order, LookupError> {
        if let Some(order) = self.cache.get(order_uid) {
            self.metrics.record_lookup("hit");
            tracing::debug!(order_uid = %order_uid, "Order found in cache");
            return Ok(order);
        }

        self.metrics.record_lookup("miss");
        tracing::debug!(order_uid = %order_uid, "Cache miss, falling back to database");

        match self.store.fetch_order(order_uid).await {
            Ok(Some(order)) => {
                self.cache.set(order_uid, order.clone());
                self.metrics.record_lookup("fallback_hit");
                self.metrics.set_cache_entries(self.cache.size());
                tracing::info!(order_uid = %order_uid, "Order fetched from database and added to cache");
                Ok(order)
            }
            Ok(None) => {
                self.metrics.record_lookup("not_found");
                Err(LookupError::NotFound(order_uid.to_string()))
            }
            Err(e) => {
                self.metrics.record_lookup("not_found");
                tracing::warn!(order_uid = %order_uid, error = %e, "Database fallback failed");
                Err(LookupError::NotFound(order_uid.to_string()))
            }
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
