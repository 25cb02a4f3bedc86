// ============================================================================
// DCA Engine Library
// Recurring-order execution engine for leveraged margin accounts
// ============================================================================

//! # DCA Engine
//!
//! Automates a recurring "sell a fixed slice of token A for token B" strategy
//! against a user's margin account in an external lending protocol. Users
//! register recurring orders; any untrusted executor later triggers each
//! scheduled execution, funding the proceeds up front and collecting the
//! traded slice out of the account in one atomic settlement batch.
//!
//! ## Design
//!
//! - **Order Coordinator** orchestrates submission, cancellation and
//!   execution, owns the record store and the strictly increasing id counter.
//! - **Order Record Store** keeps one record per live order behind an
//!   exclusive-mutator gate, with transferable record ownership.
//! - **Validation routine** is a pure function of order state plus live
//!   balance/price data, producing the clamped trade size and the
//!   floor-rounded minimum proceeds.
//!
//! External collaborators (margin protocol, token ledger, price oracle,
//! clock, event sink) are trait seams with in-memory reference
//! implementations for tests and simulations.
//!
//! ## Example
//!
//! ```rust
//! use dca_engine::prelude::*;
//! use std::sync::Arc;
//!
//! let ledger = InMemoryLedger::new();
//! let protocol = InMemoryMarginProtocol::new(ledger.clone());
//! let oracle = FixedRateOracle::new();
//! let clock = ManualClock::new(1_700_000_000);
//!
//! let coordinator_addr = Address::from_low_u64(0xC0);
//! let alice = Address::from_low_u64(1);
//! let executor = Address::from_low_u64(2);
//! let usdc = Address::from_low_u64(100);
//! let dai = Address::from_low_u64(101);
//! let scope = AccountScope::new(Address::from_low_u64(10), Address::from_low_u64(11));
//!
//! ledger.register_token(usdc, 6);
//! ledger.register_token(dai, 6);
//! ledger.mint(usdc, scope.account, 1_000_000);
//! ledger.mint(dai, executor, 1_000_000);
//! ledger.approve(executor, dai, coordinator_addr, u128::MAX).unwrap();
//! oracle.set_rate(usdc, dai, 1_000_000, 1_000_000);
//! protocol.open_account(scope, alice);
//! protocol.permit(scope, coordinator_addr);
//!
//! let coordinator = Coordinator::new(
//!     coordinator_addr,
//!     Arc::new(protocol),
//!     Arc::new(ledger),
//!     Arc::new(oracle),
//!     Arc::new(clock),
//!     Arc::new(NoOpEventHandler),
//! );
//!
//! let id = coordinator
//!     .submit(
//!         alice,
//!         OrderParams {
//!             owner: alice,
//!             scope,
//!             token_in: usdc,
//!             token_out: dai,
//!             amount_per_interval: 200_000,
//!             interval: 86_400,
//!             first_execution_time: 1_700_000_000,
//!             executions: 5,
//!         },
//!     )
//!     .unwrap();
//!
//! let receipt = coordinator.execute(executor, id).unwrap();
//! assert_eq!(receipt.amount_in, 200_000);
//! ```

pub mod domain;
pub mod engine;
pub mod interfaces;
pub mod numeric;
pub mod store;

// Re-exports for convenience
pub mod prelude {
    pub use crate::domain::{AccountScope, Address, Execution, Order, OrderId, OrderParams};
    pub use crate::engine::{Coordinator, CoordinatorError};
    pub use crate::interfaces::{
        Clock, EventHandler, FixedRateOracle, InMemoryLedger, InMemoryMarginProtocol, Instruction,
        LoggingEventHandler, ManualClock, MarginProtocol, NoOpEventHandler, OrderEvent,
        PriceOracle, RecordingEventHandler, SystemClock, TokenLedger,
    };
    pub use crate::store::{OrderStore, StoreError};
}
