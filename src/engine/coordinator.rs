// ============================================================================
// Order Coordinator
// Core business logic for submission, cancellation and execution settlement
// ============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use smallvec::smallvec;

use crate::domain::{Address, Execution, OrderId, OrderParams};
use crate::interfaces::{
    Clock, EventHandler, Instruction, InstructionBatch, MarginProtocol, OrderEvent, PriceOracle,
    TokenLedger,
};
use crate::numeric::{one_unit, NumericError};
use crate::store::OrderStore;

use super::errors::CoordinatorError;
use super::validation;

/// Orchestrates the recurring-order lifecycle: accepts submissions and
/// cancellations from users, execution triggers from arbitrary executors,
/// and settles each execution against the margin protocol.
///
/// The coordinator is the sole authorized mutator of its [`OrderStore`] and
/// owns the strictly increasing identifier counter.
pub struct Coordinator {
    /// Identity under which the coordinator holds executor proceeds,
    /// approves the margin protocol and invokes the batch mechanism.
    address: Address,

    /// Record store; mutations are gated to `address`.
    store: OrderStore,

    /// Next identifier to hand out. Starts at 0, consumed only by
    /// submissions that pass validation.
    next_order_id: AtomicU64,

    protocol: Arc<dyn MarginProtocol>,
    tokens: Arc<dyn TokenLedger>,
    oracle: Arc<dyn PriceOracle>,
    clock: Arc<dyn Clock>,
    event_handler: Arc<dyn EventHandler>,
}

impl Coordinator {
    pub fn new(
        address: Address,
        protocol: Arc<dyn MarginProtocol>,
        tokens: Arc<dyn TokenLedger>,
        oracle: Arc<dyn PriceOracle>,
        clock: Arc<dyn Clock>,
        event_handler: Arc<dyn EventHandler>,
    ) -> Self {
        Self {
            address,
            store: OrderStore::new(address),
            next_order_id: AtomicU64::new(0),
            protocol,
            tokens,
            oracle,
            clock,
            event_handler,
        }
    }

    /// The coordinator's own identity.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Read access to the record store (reads and ownership transfer are
    /// open; mutations stay gated to the coordinator).
    pub fn store(&self) -> &OrderStore {
        &self.store
    }

    // ========================================================================
    // Submission
    // ========================================================================

    /// Register a new recurring order for `caller`.
    ///
    /// The caller must be the order owner and must currently control the
    /// scoped margin account. An identifier is allocated only after both
    /// checks pass, so failed submissions consume none.
    pub fn submit(
        &self,
        caller: Address,
        params: OrderParams,
    ) -> Result<OrderId, CoordinatorError> {
        params.validate().map_err(CoordinatorError::InvalidParams)?;

        if caller != params.owner {
            return Err(CoordinatorError::CallerNotBorrower);
        }
        let controller = self.protocol.current_controller(params.scope)?;
        if controller != params.owner {
            return Err(CoordinatorError::CallerNotBorrower);
        }

        let id = OrderId::new(self.next_order_id.fetch_add(1, Ordering::AcqRel));
        self.store
            .create(self.address, params.owner, id, params.into_order())?;

        tracing::info!(owner = %params.owner, order_id = %id, "order created");
        self.event_handler.on_event(OrderEvent::OrderCreated {
            owner: params.owner,
            order_id: id,
            timestamp: Utc::now(),
        });
        Ok(id)
    }

    // ========================================================================
    // Cancellation
    // ========================================================================

    /// Destroy order `id`. Only the record's *current* owner may cancel;
    /// the `owner` field baked into the payload carries no cancel rights.
    pub fn cancel(&self, caller: Address, id: OrderId) -> Result<(), CoordinatorError> {
        // A nonexistent id has no owner, so it fails this same check.
        match self.store.owner_of(id) {
            Some(owner) if owner == caller => {},
            _ => return Err(CoordinatorError::CallerNotBorrower),
        }
        self.store.destroy(self.address, id)?;

        tracing::info!(owner = %caller, order_id = %id, "order cancelled");
        self.event_handler.on_event(OrderEvent::OrderCancelled {
            owner: caller,
            order_id: id,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Settle one scheduled slice of order `id` on behalf of `executor`.
    ///
    /// Callable by anyone. Every precondition aborts the whole call with no
    /// state change, so racing executors simply observe the updated (or
    /// destroyed) record and fail deterministically.
    ///
    /// The executor funds `min_amount_out` of `token_out` up front (pulled
    /// from a pre-granted allowance to the coordinator) and receives the
    /// traded `token_in` out of the margin account in the same atomic batch.
    pub fn execute(
        &self,
        executor: Address,
        id: OrderId,
    ) -> Result<Execution, CoordinatorError> {
        let order = self.store.read(id);
        validation::check_schedule(&order, self.clock.now())?;

        let controller = self.protocol.current_controller(order.scope)?;
        validation::check_controller(&order, controller)?;

        let balance = self.tokens.balance_of(order.scope.account, order.token_in)?;
        let amount_in = validation::clamp_amount_in(order.amount_per_interval, balance)?;

        let unit = one_unit(self.tokens.decimals(order.token_in)?)?;
        let rate = self.oracle.convert(unit, order.token_in, order.token_out)?;
        let min_amount_out = validation::min_amount_out(amount_in, rate, unit)?;

        // Executor funding: pull the proceeds, then grant the protocol
        // spending rights with a one-unit margin to absorb rounding.
        self.tokens
            .transfer(self.address, order.token_out, executor, self.address, min_amount_out)?;
        let approval = min_amount_out
            .checked_add(1)
            .ok_or(NumericError::Overflow)?;
        self.tokens
            .approve(self.address, order.token_out, order.scope.protocol, approval)?;

        // Deposit before withdraw: the fresh collateral is what keeps the
        // account healthy enough to release the withdrawal.
        let batch: InstructionBatch = smallvec![
            Instruction::AddCollateral {
                token: order.token_out,
                amount: min_amount_out,
            },
            Instruction::Withdraw {
                token: order.token_in,
                amount: amount_in,
                to: executor,
            },
        ];
        if let Err(e) = self.protocol.run_batch(self.address, order.scope, &batch) {
            self.refund_executor(executor, &order, min_amount_out);
            return Err(e.into());
        }

        let mut updated = order;
        updated.advance_schedule();
        if updated.is_exhausted() {
            self.store.destroy(self.address, id)?;
        } else {
            self.store.update(self.address, id, updated)?;
        }

        tracing::info!(
            executor = %executor,
            order_id = %id,
            amount_in,
            min_amount_out,
            executions_left = updated.executions_left,
            "order executed"
        );
        self.event_handler.on_event(OrderEvent::OrderExecuted {
            executor,
            order_id: id,
            timestamp: Utc::now(),
        });

        Ok(Execution::new(
            id,
            executor,
            order.token_in,
            order.token_out,
            amount_in,
            min_amount_out,
        ))
    }

    /// Return pre-pulled proceeds after a rejected settlement batch so the
    /// aborted call leaves no residue with the coordinator.
    ///
    /// Best-effort on purpose: the coordinator holds exactly the amount it
    /// just pulled and the token is known to the ledger, so neither step can
    /// fail against a conforming [`TokenLedger`]. A warning here means the
    /// ledger broke that contract; the original batch error still reaches
    /// the caller either way.
    fn refund_executor(&self, executor: Address, order: &crate::domain::Order, amount: u128) {
        if let Err(e) = self
            .tokens
            .approve(self.address, order.token_out, order.scope.protocol, 0)
        {
            tracing::warn!(executor = %executor, "failed to clear protocol approval: {}", e);
        }
        if let Err(e) =
            self.tokens
                .transfer(self.address, order.token_out, self.address, executor, amount)
        {
            tracing::warn!(executor = %executor, "failed to refund executor: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountScope, Order};
    use crate::interfaces::{
        FixedRateOracle, InMemoryLedger, InMemoryMarginProtocol, ManualClock,
        RecordingEventHandler,
    };
    use crate::store::StoreError;

    const COORDINATOR: Address = Address::from_low_u64(0xC0);
    const ALICE: Address = Address::from_low_u64(1);
    const BOB: Address = Address::from_low_u64(2);
    const EXECUTOR: Address = Address::from_low_u64(0xE0);
    const USDC: Address = Address::from_low_u64(100);
    const DAI: Address = Address::from_low_u64(101);

    const T0: u64 = 1_700_000_000;
    const DAY: u64 = 86_400;

    struct Fixture {
        coordinator: Coordinator,
        ledger: InMemoryLedger,
        protocol: InMemoryMarginProtocol,
        clock: ManualClock,
        events: RecordingEventHandler,
        scope: AccountScope,
    }

    fn setup(account_balance: u128) -> Fixture {
        let ledger = InMemoryLedger::new();
        let protocol = InMemoryMarginProtocol::new(ledger.clone());
        let oracle = FixedRateOracle::new();
        let clock = ManualClock::new(T0);
        let events = RecordingEventHandler::new();
        let scope = AccountScope::new(Address::from_low_u64(10), Address::from_low_u64(11));

        ledger.register_token(USDC, 6);
        ledger.register_token(DAI, 6);
        ledger.mint(USDC, scope.account, account_balance);
        ledger.mint(DAI, EXECUTOR, 10_000_000);
        // Executor pre-funds executions through an allowance to the
        // coordinator.
        ledger.approve(EXECUTOR, DAI, COORDINATOR, u128::MAX).unwrap();

        // 1 USDC unit = 1 DAI unit
        oracle.set_rate(USDC, DAI, 1_000_000, 1_000_000);

        protocol.open_account(scope, ALICE);
        protocol.permit(scope, COORDINATOR);

        let coordinator = Coordinator::new(
            COORDINATOR,
            Arc::new(protocol.clone()),
            Arc::new(ledger.clone()),
            Arc::new(oracle),
            Arc::new(clock.clone()),
            Arc::new(events.clone()),
        );
        Fixture {
            coordinator,
            ledger,
            protocol,
            clock,
            events,
            scope,
        }
    }

    fn params(f: &Fixture) -> OrderParams {
        OrderParams {
            owner: ALICE,
            scope: f.scope,
            token_in: USDC,
            token_out: DAI,
            amount_per_interval: 200_000,
            interval: DAY,
            first_execution_time: T0,
            executions: 10,
        }
    }

    // ========================================================================
    // Submission
    // ========================================================================

    #[test]
    fn test_submit_returns_increasing_ids() {
        let f = setup(1_000_000);
        let a = f.coordinator.submit(ALICE, params(&f)).unwrap();
        let b = f.coordinator.submit(ALICE, params(&f)).unwrap();
        let c = f.coordinator.submit(ALICE, params(&f)).unwrap();
        assert_eq!(a, OrderId::new(0));
        assert_eq!(b, OrderId::new(1));
        assert_eq!(c, OrderId::new(2));
    }

    #[test]
    fn test_submit_rejects_non_owner_caller() {
        let f = setup(1_000_000);
        assert_eq!(
            f.coordinator.submit(BOB, params(&f)),
            Err(CoordinatorError::CallerNotBorrower)
        );
    }

    #[test]
    fn test_submit_rejects_owner_without_account_control() {
        let f = setup(1_000_000);
        f.protocol.set_controller(f.scope, BOB);
        assert_eq!(
            f.coordinator.submit(ALICE, params(&f)),
            Err(CoordinatorError::CallerNotBorrower)
        );
    }

    #[test]
    fn test_failed_submission_consumes_no_id() {
        let f = setup(1_000_000);
        assert!(f.coordinator.submit(BOB, params(&f)).is_err());
        let mut bad = params(&f);
        bad.interval = 0;
        assert!(matches!(
            f.coordinator.submit(ALICE, bad),
            Err(CoordinatorError::InvalidParams(_))
        ));
        assert_eq!(f.coordinator.submit(ALICE, params(&f)), Ok(OrderId::new(0)));
    }

    #[test]
    fn test_submit_rejects_schedule_that_would_wrap_time() {
        let f = setup(1_000_000);
        let mut p = params(&f);
        p.executions = 1;
        p.interval = u64::MAX - p.first_execution_time + 1;
        assert_eq!(
            f.coordinator.submit(ALICE, p),
            Err(CoordinatorError::InvalidParams(
                "schedule exceeds the representable time range"
            ))
        );
        // No id consumed; the next valid submission still gets 0, and its
        // execution advances the schedule without wrapping backwards.
        let id = f.coordinator.submit(ALICE, params(&f)).unwrap();
        assert_eq!(id, OrderId::new(0));
        f.coordinator.execute(EXECUTOR, id).unwrap();
        assert!(f.coordinator.store().read(id).next_execution_time > T0);
    }

    #[test]
    fn test_submit_emits_creation_event() {
        let f = setup(1_000_000);
        let id = f.coordinator.submit(ALICE, params(&f)).unwrap();
        assert!(f.events.events().iter().any(|e| matches!(
            e,
            OrderEvent::OrderCreated { owner, order_id, .. }
                if *owner == ALICE && *order_id == id
        )));
    }

    // ========================================================================
    // Cancellation
    // ========================================================================

    #[test]
    fn test_cancel_destroys_record() {
        let f = setup(1_000_000);
        let id = f.coordinator.submit(ALICE, params(&f)).unwrap();
        f.coordinator.cancel(ALICE, id).unwrap();

        assert_eq!(f.coordinator.store().read(id), Order::default());
        assert_eq!(
            f.coordinator.execute(EXECUTOR, id),
            Err(CoordinatorError::OrderIsCancelled)
        );
        assert!(f.events.events().iter().any(|e| matches!(
            e,
            OrderEvent::OrderCancelled { order_id, .. } if *order_id == id
        )));
    }

    #[test]
    fn test_cancel_requires_current_record_owner() {
        let f = setup(1_000_000);
        let id = f.coordinator.submit(ALICE, params(&f)).unwrap();
        assert_eq!(
            f.coordinator.cancel(BOB, id),
            Err(CoordinatorError::CallerNotBorrower)
        );
        assert_eq!(f.coordinator.store().read(id).owner, ALICE);
    }

    #[test]
    fn test_cancel_nonexistent_fails_ownership_check() {
        let f = setup(1_000_000);
        assert_eq!(
            f.coordinator.cancel(ALICE, OrderId::new(99)),
            Err(CoordinatorError::CallerNotBorrower)
        );
    }

    #[test]
    fn test_record_transfer_moves_cancel_rights() {
        let f = setup(1_000_000);
        let id = f.coordinator.submit(ALICE, params(&f)).unwrap();
        f.coordinator.store().transfer(ALICE, id, BOB).unwrap();

        assert_eq!(
            f.coordinator.cancel(ALICE, id),
            Err(CoordinatorError::CallerNotBorrower)
        );
        f.coordinator.cancel(BOB, id).unwrap();
    }

    // ========================================================================
    // Execution
    // ========================================================================

    #[test]
    fn test_execute_partial_balance_scenario() {
        // Slice 200_000 against a 150_000 balance: clamp to balance - 1.
        let f = setup(150_000);
        let id = f.coordinator.submit(ALICE, params(&f)).unwrap();

        let receipt = f.coordinator.execute(EXECUTOR, id).unwrap();
        assert_eq!(receipt.amount_in, 149_999);
        assert_eq!(receipt.min_amount_out, 149_999);

        let order = f.coordinator.store().read(id);
        assert_eq!(order.executions_left, 9);
        assert_eq!(order.next_execution_time, T0 + DAY);

        // One unit stays behind; the executor holds the traded slice.
        assert_eq!(f.ledger.balance_of(f.scope.account, USDC), Ok(1));
        assert_eq!(f.ledger.balance_of(f.scope.account, DAI), Ok(149_999));
        assert_eq!(f.ledger.balance_of(EXECUTOR, USDC), Ok(149_999));
    }

    #[test]
    fn test_execute_full_slice_when_balance_suffices() {
        let f = setup(1_000_000);
        let id = f.coordinator.submit(ALICE, params(&f)).unwrap();
        let receipt = f.coordinator.execute(EXECUTOR, id).unwrap();
        assert_eq!(receipt.amount_in, 200_000);
        assert_eq!(f.ledger.balance_of(f.scope.account, USDC), Ok(800_000));
    }

    #[test]
    fn test_execute_before_eligibility_is_rejected_unchanged() {
        let f = setup(1_000_000);
        let mut p = params(&f);
        p.first_execution_time = T0 + DAY;
        let id = f.coordinator.submit(ALICE, p).unwrap();

        let before = f.coordinator.store().read(id);
        assert_eq!(
            f.coordinator.execute(EXECUTOR, id),
            Err(CoordinatorError::NotTimeYet)
        );
        assert_eq!(f.coordinator.store().read(id), before);
        assert_eq!(f.ledger.balance_of(f.scope.account, USDC), Ok(1_000_000));
        assert_eq!(f.ledger.balance_of(EXECUTOR, DAI), Ok(10_000_000));
    }

    #[test]
    fn test_execute_keeps_fixed_cadence_when_late() {
        let f = setup(10_000_000);
        let id = f.coordinator.submit(ALICE, params(&f)).unwrap();

        // Three days late: next_execution_time still advances by exactly one
        // interval from its prior value.
        f.clock.set(T0 + 3 * DAY);
        f.coordinator.execute(EXECUTOR, id).unwrap();
        assert_eq!(
            f.coordinator.store().read(id).next_execution_time,
            T0 + DAY
        );

        // Immediately eligible again (two intervals of backlog remain).
        f.coordinator.execute(EXECUTOR, id).unwrap();
        assert_eq!(
            f.coordinator.store().read(id).next_execution_time,
            T0 + 2 * DAY
        );
    }

    #[test]
    fn test_final_execution_destroys_order() {
        let f = setup(10_000_000);
        let mut p = params(&f);
        p.executions = 1;
        let id = f.coordinator.submit(ALICE, p).unwrap();

        f.coordinator.execute(EXECUTOR, id).unwrap();
        assert_eq!(f.coordinator.store().read(id), Order::default());
        assert!(!f.coordinator.store().contains(id));
        assert_eq!(
            f.coordinator.execute(EXECUTOR, id),
            Err(CoordinatorError::OrderIsCancelled)
        );
    }

    #[test]
    fn test_second_racing_executor_fails_deterministically() {
        let f = setup(10_000_000);
        let id = f.coordinator.submit(ALICE, params(&f)).unwrap();

        f.coordinator.execute(EXECUTOR, id).unwrap();
        // A rival sequenced after the first sees the advanced schedule.
        assert_eq!(
            f.coordinator.execute(BOB, id),
            Err(CoordinatorError::NotTimeYet)
        );
    }

    #[test]
    fn test_account_control_divergence_invalidates_order() {
        let f = setup(1_000_000);
        let id = f.coordinator.submit(ALICE, params(&f)).unwrap();
        f.protocol.set_controller(f.scope, BOB);
        assert_eq!(
            f.coordinator.execute(EXECUTOR, id),
            Err(CoordinatorError::InvalidOrder)
        );
    }

    #[test]
    fn test_drained_account_has_nothing_to_sell() {
        let f = setup(1);
        let id = f.coordinator.submit(ALICE, params(&f)).unwrap();
        assert_eq!(
            f.coordinator.execute(EXECUTOR, id),
            Err(CoordinatorError::NothingToSell)
        );
    }

    #[test]
    fn test_min_amount_out_floors_against_rate() {
        let f = setup(150_000);
        // 0.999999 DAI units per USDC unit
        let oracle = FixedRateOracle::new();
        oracle.set_rate(USDC, DAI, 999_999, 1_000_000);
        let coordinator = Coordinator::new(
            COORDINATOR,
            Arc::new(f.protocol.clone()),
            Arc::new(f.ledger.clone()),
            Arc::new(oracle),
            Arc::new(f.clock.clone()),
            Arc::new(RecordingEventHandler::new()),
        );

        let id = coordinator.submit(ALICE, params(&f)).unwrap();
        let receipt = coordinator.execute(EXECUTOR, id).unwrap();
        assert_eq!(receipt.amount_in, 149_999);
        // floor(149_999 * 999_999 / 1_000_000)
        assert_eq!(receipt.min_amount_out, 149_998);
    }

    #[test]
    fn test_rejected_batch_leaves_no_residue() {
        let f = setup(1_000_000);
        // A protocol that never granted the coordinator batch permission.
        let protocol = InMemoryMarginProtocol::new(f.ledger.clone());
        protocol.open_account(f.scope, ALICE);
        let oracle = FixedRateOracle::new();
        oracle.set_rate(USDC, DAI, 1_000_000, 1_000_000);
        let coordinator = Coordinator::new(
            COORDINATOR,
            Arc::new(protocol),
            Arc::new(f.ledger.clone()),
            Arc::new(oracle),
            Arc::new(f.clock.clone()),
            Arc::new(RecordingEventHandler::new()),
        );

        let id = coordinator.submit(ALICE, params(&f)).unwrap();
        let before_dai = f.ledger.balance_of(EXECUTOR, DAI).unwrap();
        assert_eq!(
            coordinator.execute(EXECUTOR, id),
            Err(CoordinatorError::Protocol(
                crate::interfaces::ProtocolError::NotPermitted
            ))
        );
        // Executor proceeds were refunded; the order is untouched.
        assert_eq!(f.ledger.balance_of(EXECUTOR, DAI), Ok(before_dai));
        assert_eq!(
            f.ledger.allowance(DAI, COORDINATOR, f.scope.protocol),
            0
        );
        assert_eq!(coordinator.store().read(id).executions_left, 10);
    }

    #[test]
    fn test_execute_emits_execution_event() {
        let f = setup(1_000_000);
        let id = f.coordinator.submit(ALICE, params(&f)).unwrap();
        f.coordinator.execute(EXECUTOR, id).unwrap();
        assert!(f.events.events().iter().any(|e| matches!(
            e,
            OrderEvent::OrderExecuted { executor, order_id, .. }
                if *executor == EXECUTOR && *order_id == id
        )));
    }

    #[test]
    fn test_store_mutation_stays_gated() {
        let f = setup(1_000_000);
        let id = f.coordinator.submit(ALICE, params(&f)).unwrap();
        assert_eq!(
            f.coordinator.store().destroy(ALICE, id),
            Err(StoreError::NotAuthorized)
        );
    }
}
