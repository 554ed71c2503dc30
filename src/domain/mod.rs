// ============================================================================
// Domain Layer
// ============================================================================
//
// Data model and ingestion rules, independent of storage, cache and
// transport.
//
// ============================================================================

pub mod order;
