// ============================================================================
// Numeric Errors
// Error types for checked amount arithmetic
// ============================================================================

use std::fmt;

/// Errors that can occur during native-unit amount arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericError {
    /// Result exceeded u128::MAX
    Overflow,
    /// Attempted division by zero
    DivisionByZero,
}

impl fmt::Display for NumericError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericError::Overflow => {
                write!(f, "arithmetic overflow: result exceeded maximum value")
            },
            NumericError::DivisionByZero => write!(f, "division by zero"),
        }
    }
}

impl std::error::Error for NumericError {}

/// Result type alias for numeric operations
pub type NumericResult<T> = Result<T, NumericError>;
