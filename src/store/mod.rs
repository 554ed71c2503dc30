// ============================================================================
// Durable Store - persistence boundary for Order Records
// ============================================================================
//
// The pipeline, lookup service and restorer only see the `OrderStore` trait.
// `PgOrderStore` is the production implementation; tests use the in-memory
// double in `memory`.
//
// ============================================================================

mod postgres;
#[cfg(test)]
pub(crate) mod memory;

use async_trait::async_trait;

use crate::domain::order::Order;
use crate::utils::IsTransient;

pub use postgres::PgOrderStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Order {order_uid} could not be reconstructed: {reason}")]
    Incomplete { order_uid: String, reason: String },
}

impl IsTransient for StoreError {
    fn is_transient(&self) -> bool {
        match self {
            StoreError::Database(e) => matches!(
                e,
                sqlx::Error::Io(_)
                    | sqlx::Error::Tls(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::WorkerCrashed
            ),
            StoreError::Incomplete { .. } => false,
        }
    }
}

/// Result of an atomic insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// All rows of the order were written.
    Inserted,
    /// An order with this identifier was already stored; nothing was written.
    AlreadyExists,
}

/// A stored order that `fetch_all` had to leave out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedOrder {
    pub order_uid: String,
    pub reason: String,
}

/// Everything `fetch_all` could reconstruct, plus what it skipped.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub orders: Vec<Order>,
    pub skipped: Vec<SkippedOrder>,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Write the order with its delivery, payment and items in one
    /// transaction. Either every row is committed or none is.
    async fn persist_order(&self, order: &Order) -> Result<PersistOutcome, StoreError>;

    /// Load every stored order fully populated. Orders that cannot be
    /// reconstructed are reported in [`FetchReport::skipped`].
    async fn fetch_all(&self) -> Result<FetchReport, StoreError>;

    /// Load a single order, `Ok(None)` if the identifier is unknown.
    async fn fetch_order(&self, order_uid: &str) -> Result<Option<Order>, StoreError>;
}
