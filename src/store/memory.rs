use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{FetchReport, OrderStore, PersistOutcome, SkippedOrder, StoreError};
use crate::domain::order::Order;

/// In-memory `OrderStore` for tests: counts calls and can be told to fail.
#[derive(Default)]
pub(crate) struct MemoryOrderStore {
    orders: Mutex<HashMap<String, Order>>,
    skipped: Mutex<Vec<SkippedOrder>>,
    persist_calls: AtomicUsize,
    fetch_order_calls: AtomicUsize,
    fail_persist: AtomicBool,
    fail_fetch: AtomicBool,
}

impl MemoryOrderStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        let store = Self::new();
        store.orders.lock().unwrap().extend(orders.into_iter().map(|o| (o.order_uid.clone(), o)));
        store
    }

    pub(crate) fn add_skipped(&self, order_uid: &str, reason: &str) {
        self.skipped.lock().unwrap().push(SkippedOrder {
            order_uid: order_uid.to_string(),
            reason: reason.to_string(),
        });
    }

    pub(crate) fn fail_persist(&self, fail: bool) {
        self.fail_persist.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn persist_calls(&self) -> usize {
        self.persist_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn fetch_order_calls(&self) -> usize {
        self.fetch_order_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn stored(&self, order_uid: &str) -> Option<Order> {
        self.orders.lock().unwrap().get(order_uid).cloned()
    }
}

fn unavailable() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn persist_order(&self, order: &Order) -> Result<PersistOutcome, StoreError> {
        self.persist_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_persist.load(Ordering::SeqCst) {
            return Err(unavailable());
        }

        let mut orders = self.orders.lock().unwrap();
        if orders.contains_key(&order.order_uid) {
            return Ok(PersistOutcome::AlreadyExists);
        }
        orders.insert(order.order_uid.clone(), order.clone());
        Ok(PersistOutcome::Inserted)
    }

    async fn fetch_all(&self) -> Result<FetchReport, StoreError> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(FetchReport {
            orders: self.orders.lock().unwrap().values().cloned().collect(),
            skipped: self.skipped.lock().unwrap().clone(),
        })
    }

    async fn fetch_order(&self, order_uid: &str) -> Result<Option<Order>, StoreError> {
        self.fetch_order_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.orders.lock().unwrap().get(order_uid).cloned())
    }
}

/// A complete, valid order for tests.
pub(crate) fn sample_order(order_uid: &str) -> Order {
    serde_json::from_value(serde_json::json!({
        "order_uid": order_uid,
        "track_number": "WBILMTESTTRACK",
        "entry": "WBIL",
        "delivery": {
            "name": "Test Testov",
            "phone": "+9720000000",
            "zip": "2639809",
            "city": "Kiryat Mozkin",
            "address": "Ploshad Mira 15",
            "region": "Kraiot",
            "email": "test@gmail.com"
        },
        "payment": {
            "transaction": order_uid,
            "currency": "USD",
            "provider": "wbpay",
            "amount": 1817,
            "payment_dt": 1637907727,
            "bank": "alpha",
            "delivery_cost": 1500,
            "goods_total": 317,
            "custom_fee": 0
        },
        "items": [{
            "chrt_id": 9934930,
            "track_number": "WBILMTESTTRACK",
            "price": 453,
            "rid": "ab4219087a764ae0btest",
            "name": "Mascaras",
            "sale": 30,
            "size": "0",
            "total_price": 317,
            "nm_id": 2389212,
            "brand": "Vivienne Sabo",
            "status": 202
        }],
        "locale": "en",
        "customer_id": "test",
        "delivery_service": "meest",
        "shardkey": "9",
        "sm_id": 99,
        "date_created": "2021-11-26T06:22:19Z",
        "oof_shard": "1"
    }))
    .unwrap()
}
