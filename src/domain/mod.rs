// ============================================================================
// Domain Models Module
// Contains all core domain entities and value objects
// ============================================================================

pub mod execution;
pub mod identity;
pub mod order;

pub use execution::Execution;
pub use identity::{AccountScope, Address};
pub use order::{Order, OrderId, OrderParams};
