// ============================================================================
// Read-side services over the cache and the store
// ============================================================================

mod lookup;
mod restore;

pub use lookup::{LookupError, LookupService};
pub use restore::{RestoreSummary, StartupRestorer};
