// ============================================================================
// Coordinator Errors
// Error taxonomy for submit / cancel / execute
// ============================================================================

use std::fmt;

use crate::interfaces::{OracleError, ProtocolError, TokenError};
use crate::numeric::NumericError;
use crate::store::StoreError;

/// Errors surfaced by coordinator operations. Every variant is fatal to the
/// enclosing call: the call aborts and no partial state change persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorError {
    /// Caller lacks authorization for submit/cancel
    CallerNotBorrower,
    /// Execution attempted on a nonexistent or destroyed order
    OrderIsCancelled,
    /// Account control has diverged from the order's recorded owner
    InvalidOrder,
    /// Execution attempted before schedule eligibility
    NotTimeYet,
    /// Guard against an already-exhausted order (unreachable under the
    /// destroy-on-exhaustion discipline)
    NoExecutionsLeft,
    /// Insufficient balance in the scoped account to trade anything
    NothingToSell,
    /// Degenerate submission payload
    InvalidParams(&'static str),
    /// Amount math failed
    Numeric(NumericError),
    /// The margin protocol refused a query or batch
    Protocol(ProtocolError),
    /// A token primitive failed
    Token(TokenError),
    /// The conversion service failed
    Oracle(OracleError),
    /// The record store refused a mutation
    Store(StoreError),
}

impl CoordinatorError {
    /// True for conditions that clear on their own (time passing, balance
    /// arriving); callers can retry these without operator intervention.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CoordinatorError::NotTimeYet | CoordinatorError::NothingToSell
        )
    }
}

impl fmt::Display for CoordinatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinatorError::CallerNotBorrower => {
                write!(f, "caller is not the borrower for this operation")
            },
            CoordinatorError::OrderIsCancelled => write!(f, "order is cancelled or never existed"),
            CoordinatorError::InvalidOrder => {
                write!(f, "account control diverged from the order owner")
            },
            CoordinatorError::NotTimeYet => write!(f, "next execution is not due yet"),
            CoordinatorError::NoExecutionsLeft => write!(f, "order has no executions left"),
            CoordinatorError::NothingToSell => {
                write!(f, "account balance too low to execute a trade")
            },
            CoordinatorError::InvalidParams(reason) => {
                write!(f, "invalid order parameters: {}", reason)
            },
            CoordinatorError::Numeric(e) => write!(f, "amount computation failed: {}", e),
            CoordinatorError::Protocol(e) => write!(f, "margin protocol error: {}", e),
            CoordinatorError::Token(e) => write!(f, "token error: {}", e),
            CoordinatorError::Oracle(e) => write!(f, "price oracle error: {}", e),
            CoordinatorError::Store(e) => write!(f, "order store error: {}", e),
        }
    }
}

impl std::error::Error for CoordinatorError {}

impl From<NumericError> for CoordinatorError {
    fn from(e: NumericError) -> Self {
        CoordinatorError::Numeric(e)
    }
}

impl From<ProtocolError> for CoordinatorError {
    fn from(e: ProtocolError) -> Self {
        CoordinatorError::Protocol(e)
    }
}

impl From<TokenError> for CoordinatorError {
    fn from(e: TokenError) -> Self {
        CoordinatorError::Token(e)
    }
}

impl From<OracleError> for CoordinatorError {
    fn from(e: OracleError) -> Self {
        CoordinatorError::Oracle(e)
    }
}

impl From<StoreError> for CoordinatorError {
    fn from(e: StoreError) -> Self {
        CoordinatorError::Store(e)
    }
}
