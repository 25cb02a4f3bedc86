// ============================================================================
// Recurring Order Domain Model
// ============================================================================

use super::identity::{AccountScope, Address};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ============================================================================
// Value Objects
// ============================================================================

/// Counter-assigned order identifier. Strictly increasing, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrderId(pub u64);

impl OrderId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// Order Entity
// ============================================================================

/// One recurring "sell a fixed slice of `token_in` for `token_out`" order.
///
/// Stored by the [`OrderStore`](crate::store::OrderStore) and mutated only by
/// the coordinator. `Order::default()` is the all-zero sentinel returned when
/// reading a destroyed or never-created record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Order {
    /// The user recorded at submission time. Execution validity is tied to
    /// this identity still controlling `scope`; cancel rights follow the
    /// store's current record owner instead.
    pub owner: Address,
    /// The margin account this order is allowed to act upon.
    pub scope: AccountScope,
    /// Asset sold each execution.
    pub token_in: Address,
    /// Asset bought (deposited as collateral) each execution.
    pub token_out: Address,
    /// Fixed notional slice of `token_in` targeted per execution, in the
    /// token's native unit.
    pub amount_per_interval: u128,
    /// Seconds between eligible executions.
    pub interval: u64,
    /// Earliest unix timestamp at which the next execution may occur.
    /// Only ever increases, by exactly `interval` per successful execution.
    pub next_execution_time: u64,
    /// Immutable original schedule length (informational).
    pub total_executions: u32,
    /// Remaining eligible executions. Strictly decreasing; an order never
    /// rests in the store at zero.
    pub executions_left: u32,
}

impl Order {
    /// True once the schedule is fully consumed.
    pub const fn is_exhausted(&self) -> bool {
        self.executions_left == 0
    }

    /// Consume one execution slot: decrement `executions_left` and push
    /// `next_execution_time` forward by exactly one `interval`.
    ///
    /// The cadence is anchored to the original schedule, not to "now", so a
    /// late execution does not drift the remaining ones. Cannot overflow:
    /// [`OrderParams::validate`] bounds the whole schedule within `u64`.
    pub fn advance_schedule(&mut self) {
        self.executions_left -= 1;
        self.next_execution_time += self.interval;
    }
}

// ============================================================================
// Submission Payload
// ============================================================================

/// Parameters supplied by the user when submitting a new order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrderParams {
    pub owner: Address,
    pub scope: AccountScope,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_per_interval: u128,
    pub interval: u64,
    /// Timestamp of the first eligible execution.
    pub first_execution_time: u64,
    /// Total number of scheduled executions.
    pub executions: u32,
}

impl OrderParams {
    /// Validate the submission payload.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.owner.is_zero() {
            return Err("owner cannot be the zero address");
        }
        if self.scope.is_empty() {
            return Err("account scope cannot be empty");
        }
        if self.token_in == self.token_out {
            return Err("token pair must be distinct");
        }
        if self.amount_per_interval == 0 {
            return Err("amount per interval must be positive");
        }
        if self.interval == 0 {
            return Err("interval must be positive");
        }
        if self.executions == 0 {
            return Err("schedule must contain at least one execution");
        }
        // The last execution time must stay representable, so schedule
        // advancement never wraps.
        let end = self
            .interval
            .checked_mul(u64::from(self.executions))
            .and_then(|span| self.first_execution_time.checked_add(span));
        if end.is_none() {
            return Err("schedule exceeds the representable time range");
        }
        Ok(())
    }

    /// Materialize the order entity stored for this submission.
    pub fn into_order(self) -> Order {
        Order {
            owner: self.owner,
            scope: self.scope,
            token_in: self.token_in,
            token_out: self.token_out,
            amount_per_interval: self.amount_per_interval,
            interval: self.interval,
            next_execution_time: self.first_execution_time,
            total_executions: self.executions,
            executions_left: self.executions,
        }
    }
}
