// ============================================================================
// Execution Receipt Domain Model
// ============================================================================

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::identity::Address;
use super::order::OrderId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Settlement details of one completed execution, returned to the executor.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Execution {
    /// Unique receipt identifier
    pub id: Uuid,

    /// The order this execution belongs to
    pub order_id: OrderId,

    /// The party that triggered the execution and received `token_in`
    pub executor: Address,

    /// Asset withdrawn from the margin account to the executor
    pub token_in: Address,

    /// Asset deposited as collateral into the margin account
    pub token_out: Address,

    /// `token_in` withdrawn, after clamping against the account balance
    pub amount_in: u128,

    /// `token_out` collected from the executor and deposited as collateral
    pub min_amount_out: u128,

    /// Receipt timestamp
    pub timestamp: DateTime<Utc>,
}

impl Execution {
    pub fn new(
        order_id: OrderId,
        executor: Address,
        token_in: Address,
        token_out: Address,
        amount_in: u128,
        min_amount_out: u128,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            executor,
            token_in,
            token_out,
            amount_in,
            min_amount_out,
            timestamp: Utc::now(),
        }
    }
}
