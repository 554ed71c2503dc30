// ============================================================================
// Order Domain - the Order Record and its ingestion-boundary rules
// ============================================================================
//
// - Value objects (Order, Delivery, Payment, Item)
// - Decode and validation stages
// - Errors (OrderError enum)
//
// ============================================================================

pub mod value_objects;
pub mod validation;
pub mod errors;

// Re-export for convenience
pub use value_objects::*;
pub use validation::*;
pub use errors::*;
