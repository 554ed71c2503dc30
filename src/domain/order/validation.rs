use chrono::SubsecRound;

use super::errors::OrderError;
use super::value_objects::Order;

// ============================================================================
// Decode & Validate - the two ingestion-boundary stages
// ============================================================================
//
// Decoding only checks that the payload is well-formed JSON matching the
// Order schema. Timestamps are cut to the microsecond precision the store
// keeps, so a cached order equals the one read back later. Validation is a separate pass over the typed value and
// enforces the identity rules; every other field is accepted as-is.
//
// ============================================================================

/// Deserialize a raw stream payload into an [`Order`].
pub fn decode_order(payload: &[u8]) -> Result<Order, OrderError> {
    if payload.is_empty() {
        return Err(OrderError::EmptyPayload);
    }
    let mut order: Order = serde_json::from_slice(payload)?;
    order.date_created = order.date_created.trunc_subsecs(6);
    Ok(order)
}

/// Check the identity rules of an order. Returns the first violation found.
pub fn validate_order(order: &Order) -> Result<(), OrderError> {
    if order.order_uid.is_empty() {
        return Err(OrderError::MissingOrderUid);
    }
    if order.track_number.is_empty() {
        return Err(OrderError::MissingTrackNumber);
    }
    if order.payment.transaction.is_empty() {
        return Err(OrderError::MissingTransaction);
    }
    if order.items.is_empty() {
        return Err(OrderError::EmptyItems);
    }
    Ok(())
}

/// Printable prefix of a payload for log lines.
pub fn payload_preview(payload: &[u8]) -> String {
    String::from_utf8_lossy(payload).chars().take(200).collect()
}

// ============================================================================
// Unit Tests
// ============================================================================
