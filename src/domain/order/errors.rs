// ============================================================================
// Order Ingestion Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Malformed order payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Message has no payload")]
    EmptyPayload,

    #[error("order_uid is required")]
    MissingOrderUid,

    #[error("track_number is required")]
    MissingTrackNumber,

    #[error("payment.transaction is required")]
    MissingTransaction,

    #[error("at least one item is required")]
    EmptyItems,
}
