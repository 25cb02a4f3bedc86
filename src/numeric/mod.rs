// ============================================================================
// Numeric Module
// Checked integer arithmetic for native-unit token amounts
// ============================================================================
//
// This module provides:
// - mul_div_floor / one_unit: overflow-checked amount math
// - NumericError: Error types for arithmetic operations
//
// Design principles:
// - No floating-point operations
// - All arithmetic returns Result (no panics)
// - Amounts are protocol-native u128 integers; scaling is explicit

mod errors;
mod math;

pub use errors::{NumericError, NumericResult};
pub use math::{mul_div_floor, one_unit};
