// ============================================================================
// Price Oracle Interface
// Synchronous conversion quotes, trusted at face value
// ============================================================================

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::domain::Address;
use crate::numeric::{mul_div_floor, NumericError};

/// Errors surfaced by a conversion query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleError {
    /// No rate is known for the requested pair
    UnknownPair,
    /// Scaling the quote overflowed
    Numeric(NumericError),
}

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OracleError::UnknownPair => write!(f, "no conversion rate for token pair"),
            OracleError::Numeric(e) => write!(f, "conversion math failed: {}", e),
        }
    }
}

impl std::error::Error for OracleError {}

impl From<NumericError> for OracleError {
    fn from(e: NumericError) -> Self {
        OracleError::Numeric(e)
    }
}

/// Conversion service: how much `token_out` is `amount` of `token_in` worth
/// right now. Side-effect free; the engine trusts the quote at call time.
pub trait PriceOracle: Send + Sync {
    fn convert(
        &self,
        amount: u128,
        token_in: Address,
        token_out: Address,
    ) -> Result<u128, OracleError>;
}

/// Table-driven oracle for tests and simulations.
///
/// A rate entry says "`rate` native units of `token_out` per `unit` native
/// units of `token_in`"; quotes scale linearly with floor rounding.
#[derive(Clone, Default)]
pub struct FixedRateOracle {
    rates: Arc<RwLock<HashMap<(Address, Address), (u128, u128)>>>,
}

impl FixedRateOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_rate(&self, token_in: Address, token_out: Address, rate: u128, unit: u128) {
        self.rates
            .write()
            .insert((token_in, token_out), (rate, unit));
    }
}

impl PriceOracle for FixedRateOracle {
    fn convert(
        &self,
        amount: u128,
        token_in: Address,
        token_out: Address,
    ) -> Result<u128, OracleError> {
        let (rate, unit) = *self
            .rates
            .read()
            .get(&(token_in, token_out))
            .ok_or(OracleError::UnknownPair)?;
        Ok(mul_div_floor(amount, rate, unit)?)
    }
}
