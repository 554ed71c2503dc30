use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use super::{FetchReport, OrderStore, PersistOutcome, SkippedOrder, StoreError};
use crate::domain::order::{Delivery, Item, Order, Payment};

// ============================================================================
// PostgreSQL Order Store
// ============================================================================
//
// Four tables:
// - orders      root fields, keyed by order_uid
// - deliveries  one row per order
// - payments    one row per order, carries the payment transaction value
// - items       many rows per order, kept in insertion order by id
//
// ============================================================================

const SCHEMA: [&str; 5] = [
    "CREATE TABLE IF NOT EXISTS orders (
        order_uid          TEXT PRIMARY KEY,
        track_number       TEXT NOT NULL,
        entry              TEXT NOT NULL,
        locale             TEXT NOT NULL,
        internal_signature TEXT NOT NULL,
        customer_id        TEXT NOT NULL,
        delivery_service   TEXT NOT NULL,
        shardkey           TEXT NOT NULL,
        sm_id              INTEGER NOT NULL,
        date_created       TIMESTAMPTZ NOT NULL,
        oof_shard          TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS deliveries (
        order_uid TEXT PRIMARY KEY REFERENCES orders (order_uid) ON DELETE CASCADE,
        name      TEXT NOT NULL,
        phone     TEXT NOT NULL,
        zip       TEXT NOT NULL,
        city      TEXT NOT NULL,
        address   TEXT NOT NULL,
        region    TEXT NOT NULL,
        email     TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS payments (
        order_uid     TEXT PRIMARY KEY REFERENCES orders (order_uid) ON DELETE CASCADE,
        \"transaction\" TEXT NOT NULL,
        request_id    TEXT NOT NULL,
        currency      TEXT NOT NULL,
        provider      TEXT NOT NULL,
        amount        BIGINT NOT NULL,
        payment_dt    BIGINT NOT NULL,
        bank          TEXT NOT NULL,
        delivery_cost BIGINT NOT NULL,
        goods_total   BIGINT NOT NULL,
        custom_fee    BIGINT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS items (
        id           BIGSERIAL PRIMARY KEY,
        order_uid    TEXT NOT NULL REFERENCES orders (order_uid) ON DELETE CASCADE,
        chrt_id      BIGINT NOT NULL,
        track_number TEXT NOT NULL,
        price        BIGINT NOT NULL,
        rid          TEXT NOT NULL,
        name         TEXT NOT NULL,
        sale         INTEGER NOT NULL,
        size         TEXT NOT NULL,
        total_price  BIGINT NOT NULL,
        nm_id        BIGINT NOT NULL,
        brand        TEXT NOT NULL,
        status       INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS items_order_uid_idx ON items (order_uid)",
];

const SELECT_ORDER_HEADS: &str = "
    SELECT
        o.order_uid, o.track_number, o.entry, o.locale, o.internal_signature,
        o.customer_id, o.delivery_service, o.shardkey, o.sm_id, o.date_created, o.oof_shard,
        d.name, d.phone, d.zip, d.city, d.address, d.region, d.email,
        p.\"transaction\", p.request_id, p.currency, p.provider, p.amount, p.payment_dt,
        p.bank, p.delivery_cost, p.goods_total, p.custom_fee
    FROM orders o
    LEFT JOIN deliveries d ON d.order_uid = o.order_uid
    LEFT JOIN payments p ON p.order_uid = o.order_uid";

const SELECT_ITEMS: &str = "
    SELECT order_uid, chrt_id, track_number, price, rid, name, sale, size,
           total_price, nm_id, brand, status
    FROM items";

pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Open a connection pool and verify the server answers.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        sqlx::query("SELECT 1").execute(&pool).await?;

        tracing::info!(max_connections = max_connections, "✅ Database connection pool created");
        Ok(Self { pool })
    }

    /// Create the order tables if they are missing.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::info!("Order schema ready");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Database connection pool closed");
    }

    async fn load_items(
        &self,
        order_uid: Option<&str>,
    ) -> Result<HashMap<String, Result<Vec<Item>, String>>, StoreError> {
        let rows = match order_uid {
            Some(uid) => {
                let sql = format!("{SELECT_ITEMS} WHERE order_uid = $1 ORDER BY id");
                sqlx::query(&sql).bind(uid).fetch_all(&self.pool).await?
            }
            None => {
                let sql = format!("{SELECT_ITEMS} ORDER BY order_uid, id");
                sqlx::query(&sql).fetch_all(&self.pool).await?
            }
        };

        let mut items: HashMap<String, Result<Vec<Item>, String>> = HashMap::new();
        for row in rows {
            let uid: String = match row.try_get("order_uid") {
                Ok(uid) => uid,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping item row without readable order_uid");
                    continue;
                }
            };
            let entry = items.entry(uid).or_insert_with(|| Ok(Vec::new()));
            match item_from_row(&row) {
                Ok(item) => {
                    if let Ok(list) = entry {
                        list.push(item);
                    }
                }
                Err(e) => *entry = Err(format!("unreadable item row: {e}")),
            }
        }
        Ok(items)
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn persist_order(&self, order: &Order) -> Result<PersistOutcome, StoreError> {
        tracing::debug!(order_uid = %order.order_uid, "Starting to save order");

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO orders (
                order_uid, track_number, entry, locale, internal_signature,
                customer_id, delivery_service, shardkey, sm_id, date_created, oof_shard
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (order_uid) DO NOTHING",
        )
        .bind(&order.order_uid)
        .bind(&order.track_number)
        .bind(&order.entry)
        .bind(&order.locale)
        .bind(&order.internal_signature)
        .bind(&order.customer_id)
        .bind(&order.delivery_service)
        .bind(&order.shardkey)
        .bind(order.sm_id)
        .bind(order.date_created)
        .bind(&order.oof_shard)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            tx.rollback().await?;
            tracing::info!(order_uid = %order.order_uid, "Order already stored, nothing written");
            return Ok(PersistOutcome::AlreadyExists);
        }

        let delivery = &order.delivery;
        sqlx::query(
            "INSERT INTO deliveries (order_uid, name, phone, zip, city, address, region, email)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&order.order_uid)
        .bind(&delivery.name)
        .bind(&delivery.phone)
        .bind(&delivery.zip)
        .bind(&delivery.city)
        .bind(&delivery.address)
        .bind(&delivery.region)
        .bind(&delivery.email)
        .execute(&mut *tx)
        .await?;

        let payment = &order.payment;
        sqlx::query(
            "INSERT INTO payments (
                order_uid, \"transaction\", request_id, currency, provider, amount,
                payment_dt, bank, delivery_cost, goods_total, custom_fee
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(&order.order_uid)
        .bind(&payment.transaction)
        .bind(&payment.request_id)
        .bind(&payment.currency)
        .bind(&payment.provider)
        .bind(payment.amount)
        .bind(payment.payment_dt)
        .bind(&payment.bank)
        .bind(payment.delivery_cost)
        .bind(payment.goods_total)
        .bind(payment.custom_fee)
        .execute(&mut *tx)
        .await?;

        for item in &order.items {
            sqlx::query(
                "INSERT INTO items (
                    order_uid, chrt_id, track_number, price, rid, name,
                    sale, size, total_price, nm_id, brand, status
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            )
            .bind(&order.order_uid)
            .bind(item.chrt_id)
            .bind(&item.track_number)
            .bind(item.price)
            .bind(&item.rid)
            .bind(&item.name)
            .bind(item.sale)
            .bind(&item.size)
            .bind(item.total_price)
            .bind(item.nm_id)
            .bind(&item.brand)
            .bind(item.status)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            order_uid = %order.order_uid,
            items = order.items.len(),
            "🎉 Order saved to all tables"
        );
        Ok(PersistOutcome::Inserted)
    }

    async fn fetch_all(&self) -> Result<FetchReport, StoreError> {
        let sql = format!("{SELECT_ORDER_HEADS} ORDER BY o.date_created DESC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let heads = rows.iter().map(order_head_from_row).collect();
        let items = self.load_items(None).await?;

        let report = assemble_orders(heads, items);
        tracing::info!(
            loaded = report.orders.len(),
            skipped = report.skipped.len(),
            "Retrieved orders from database"
        );
        Ok(report)
    }

    async fn fetch_order(&self, order_uid: &str) -> Result<Option<Order>, StoreError> {
        let sql = format!("{SELECT_ORDER_HEADS} WHERE o.order_uid = $1");
        let Some(row) = sqlx::query(&sql).bind(order_uid).fetch_optional(&self.pool).await? else {
            return Ok(None);
        };
        let items = self.load_items(Some(order_uid)).await?;

        let mut report = assemble_orders(vec![order_head_from_row(&row)], items);
        if let Some(skipped) = report.skipped.pop() {
            return Err(StoreError::Incomplete {
                order_uid: skipped.order_uid,
                reason: skipped.reason,
            });
        }
        Ok(report.orders.pop())
    }
}

// ============================================================================
// Row Mapping
// ============================================================================

/// Order with delivery and payment populated and no items yet.
fn order_head_from_row(row: &PgRow) -> Result<Order, SkippedOrder> {
    let order_uid: String = row.try_get("order_uid").map_err(|e| SkippedOrder {
        order_uid: "<unreadable>".to_string(),
        reason: e.to_string(),
    })?;
    let skip = |reason: String| SkippedOrder { order_uid: order_uid.clone(), reason };

    // Deliveries and payments are LEFT JOINed; a missing row shows up as NULLs.
    let has_delivery = row
        .try_get::<Option<String>, _>("name")
        .map_err(|e| skip(e.to_string()))?
        .is_some();
    if !has_delivery {
        return Err(skip("missing delivery row".to_string()));
    }
    let has_payment = row
        .try_get::<Option<String>, _>("transaction")
        .map_err(|e| skip(e.to_string()))?
        .is_some();
    if !has_payment {
        return Err(skip("missing payment row".to_string()));
    }

    let decode = || -> Result<Order, sqlx::Error> {
        Ok(Order {
            order_uid: order_uid.clone(),
            track_number: row.try_get("track_number")?,
            entry: row.try_get("entry")?,
            delivery: Delivery {
                name: row.try_get("name")?,
                phone: row.try_get("phone")?,
                zip: row.try_get("zip")?,
                city: row.try_get("city")?,
                address: row.try_get("address")?,
                region: row.try_get("region")?,
                email: row.try_get("email")?,
            },
            payment: Payment {
                transaction: row.try_get("transaction")?,
                request_id: row.try_get("request_id")?,
                currency: row.try_get("currency")?,
                provider: row.try_get("provider")?,
                amount: row.try_get("amount")?,
                payment_dt: row.try_get("payment_dt")?,
                bank: row.try_get("bank")?,
                delivery_cost: row.try_get("delivery_cost")?,
                goods_total: row.try_get("goods_total")?,
                custom_fee: row.try_get("custom_fee")?,
            },
            items: Vec::new(),
            locale: row.try_get("locale")?,
            internal_signature: row.try_get("internal_signature")?,
            customer_id: row.try_get("customer_id")?,
            delivery_service: row.try_get("delivery_service")?,
            shardkey: row.try_get("shardkey")?,
            sm_id: row.try_get("sm_id")?,
            date_created: row.try_get("date_created")?,
            oof_shard: row.try_get("oof_shard")?,
        })
    };
    decode().map_err(|e| skip(e.to_string()))
}

fn item_from_row(row: &PgRow) -> Result<Item, sqlx::Error> {
    Ok(Item {
        chrt_id: row.try_get("chrt_id")?,
        track_number: row.try_get("track_number")?,
        price: row.try_get("price")?,
        rid: row.try_get("rid")?,
        name: row.try_get("name")?,
        sale: row.try_get("sale")?,
        size: row.try_get("size")?,
        total_price: row.try_get("total_price")?,
        nm_id: row.try_get("nm_id")?,
        brand: row.try_get("brand")?,
        status: row.try_get("status")?,
    })
}

/// Attach items to order heads. An order whose head or items could not be
/// decoded, or that has no items at all, is reported as skipped.
fn assemble_orders(
    heads: Vec<Result<Order, SkippedOrder>>,
    mut items: HashMap<String, Result<Vec<Item>, String>>,
) -> FetchReport {
    let mut report = FetchReport::default();

    for head in heads {
        let mut order = match head {
            Ok(order) => order,
            Err(skipped) => {
                tracing::warn!(
                    order_uid = %skipped.order_uid,
                    reason = %skipped.reason,
                    "Skipping order that failed to reconstruct"
                );
                report.skipped.push(skipped);
                continue;
            }
        };

        let reason = match items.remove(&order.order_uid) {
            Some(Ok(list)) if !list.is_empty() => {
                order.items = list;
                report.orders.push(order);
                continue;
            }
            Some(Err(reason)) => reason,
            _ => "no items stored".to_string(),
        };

        tracing::warn!(order_uid = %order.order_uid, reason = %reason, "Skipping order that failed to reconstruct");
        report.skipped.push(SkippedOrder { order_uid: order.order_uid, reason });
    }

    report
}

// ============================================================================
// Unit Tests
// ============================================================================
