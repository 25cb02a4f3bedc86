// ============================================================================
// Engine Module
// Coordinator orchestration and execution validation
// ============================================================================

mod coordinator;
mod errors;
pub mod validation;

pub use coordinator::Coordinator;
pub use errors::CoordinatorError;
