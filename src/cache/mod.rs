use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::order::Order;

// ============================================================================
// Order Cache - in-memory read path
// ============================================================================
//
// Unbounded map from order_uid to Order. Writers are exclusive, readers
// share the lock. Values are cloned in and out, so no caller ever holds a
// reference into the map.
//
// ============================================================================

#[derive(Default)]
pub struct OrderCache {
    entries: RwLock<HashMap<String, Order>>,
}

impl OrderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for `order_uid`.
    pub fn set(&self, order_uid: &str, order: Order) {
        self.write().insert(order_uid.to_string(), order);
    }

    pub fn get(&self, order_uid: &str) -> Option<Order> {
        self.read().get(order_uid).cloned()
    }

    pub fn delete(&self, order_uid: &str) {
        self.write().remove(order_uid);
    }

    /// Snapshot of every cached order. Later cache writes do not affect it.
    pub fn get_all(&self) -> Vec<Order> {
        self.read().values().cloned().collect()
    }

    pub fn size(&self) -> usize {
        self.read().len()
    }

    // Poisoning is ignored: every write is a single insert or remove.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Order>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Order>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn order(uid: &str) -> Order {
        Order {
            order_uid: uid.to_string(),
            track_number: format!("TRACK-{uid}"),
            ..Default::default()
        }
    }

    #[test]
    fn test_set_and_get() {
        let cache = OrderCache::new();
        cache.set("o-1", order("o-1"));

        assert_eq!(cache.get("o-1"), Some(order("o-1")));
        assert_eq!(cache.get("o-2"), None);
    }

    #[test]
    fn test_set_is_idempotent() {
        let cache = OrderCache::new();
        cache.set("o-1", order("o-1"));
        cache.set("o-1", order("o-1"));

        assert_eq!(cache.size(), 1);
        assert_eq!(cache.get("o-1"), Some(order("o-1")));
    }

    #[test]
    fn test_set_overwrites() {
        let cache = OrderCache::new();
        cache.set("o-1", order("o-1"));

        let mut updated = order("o-1");
        updated.locale = "ru".to_string();
        cache.set("o-1", updated.clone());

        assert_eq!(cache.get("o-1"), Some(updated));
    }

    #[test]
    fn test_delete() {
        let cache = OrderCache::new();
        cache.set("o-1", order("o-1"));
        cache.delete("o-1");
        cache.delete("never-there");

        assert_eq!(cache.get("o-1"), None);
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_get_all_is_a_snapshot() {
        let cache = OrderCache::new();
        cache.set("o-1", order("o-1"));
        cache.set("o-2", order("o-2"));

        let snapshot = cache.get_all();
        cache.set("o-3", order("o-3"));
        cache.delete("o-1");

        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.iter().any(|o| o.order_uid == "o-1"));
        assert_eq!(cache.size(), 2);
    }

    #[test]
    fn test_concurrent_writers_and_readers() {
        let cache = Arc::new(OrderCache::new());

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let uid = format!("w{worker}-{i}");
                        cache.set(&uid, order(&uid));
                        assert!(cache.get(&uid).is_some());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.size(), 800);
    }
}
