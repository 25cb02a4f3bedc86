// ============================================================================
// Amount Math
// Overflow-checked helpers for native-unit token amounts
// ============================================================================

use super::errors::{NumericError, NumericResult};

/// Compute `floor(a * b / divisor)` without overflow surprises.
///
/// The intermediate product is checked; truncation toward zero is the
/// intended rounding mode for minimum-proceeds figures.
#[inline]
pub fn mul_div_floor(a: u128, b: u128, divisor: u128) -> NumericResult<u128> {
    if divisor == 0 {
        return Err(NumericError::DivisionByZero);
    }
    let product = a.checked_mul(b).ok_or(NumericError::Overflow)?;
    Ok(product / divisor)
}

/// One whole token unit, scaled by the token's decimal precision (10^decimals).
#[inline]
pub fn one_unit(decimals: u8) -> NumericResult<u128> {
    10u128
        .checked_pow(u32::from(decimals))
        .ok_or(NumericError::Overflow)
}
