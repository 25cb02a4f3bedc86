// ============================================================================
// Store Module
// The order record store owned by the coordinator
// ============================================================================

mod order_store;

pub use order_store::{OrderStore, StoreError};
