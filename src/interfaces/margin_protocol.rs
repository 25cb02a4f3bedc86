// ============================================================================
// Margin Protocol Interface
// Account-control queries and permissioned atomic batch settlement
// ============================================================================

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::domain::{AccountScope, Address};
use crate::interfaces::token::{InMemoryLedger, TokenLedger};

/// One sub-operation of a settlement batch. Instructions apply strictly in
/// the order given; the whole batch applies or none of it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// Pull `amount` of `token` from the batch caller and deposit it as
    /// collateral into the scoped account.
    AddCollateral { token: Address, amount: u128 },
    /// Move `amount` of `token` out of the scoped account to `to`.
    Withdraw {
        token: Address,
        amount: u128,
        to: Address,
    },
}

/// Settlement batches carry exactly two instructions in this design; keep
/// them inline.
pub type InstructionBatch = SmallVec<[Instruction; 2]>;

/// Errors surfaced by the margin protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// The scope does not name an open account
    UnknownAccount,
    /// The caller holds no standing batch permission on the account
    NotPermitted,
    /// An instruction failed; nothing was applied
    BatchRejected(&'static str),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::UnknownAccount => write!(f, "unknown margin account"),
            ProtocolError::NotPermitted => {
                write!(f, "caller lacks batch permission on the account")
            },
            ProtocolError::BatchRejected(reason) => {
                write!(f, "settlement batch rejected: {}", reason)
            },
        }
    }
}

impl std::error::Error for ProtocolError {}

/// The external lending/margin protocol, seen through the two entry points
/// the engine needs: who controls an account, and the permissioned atomic
/// batch mechanism.
pub trait MarginProtocol: Send + Sync {
    /// Current controller of the scoped account.
    fn current_controller(&self, scope: AccountScope) -> Result<Address, ProtocolError>;

    /// Run an ordered settlement batch against the scoped account.
    ///
    /// The caller must hold a previously granted standing permission on the
    /// account. Execution is all-or-nothing and strictly in-order.
    fn run_batch(
        &self,
        caller: Address,
        scope: AccountScope,
        instructions: &[Instruction],
    ) -> Result<(), ProtocolError>;
}

// ============================================================================
// In-Memory Reference Implementation
// ============================================================================

#[derive(Default)]
struct ProtocolState {
    /// scope -> current account controller
    controllers: HashMap<AccountScope, Address>,
    /// scope -> parties with standing batch permission
    permitted: HashMap<AccountScope, HashSet<Address>>,
    /// scope -> minimum total holdings the account must keep after every
    /// instruction (a crude solvency gauge; 0 when unset)
    solvency_floor: HashMap<AccountScope, u128>,
}

/// In-memory margin protocol for tests and simulations. Custodies account
/// funds on a shared [`InMemoryLedger`], holding them at the scope's account
/// address.
#[derive(Clone)]
pub struct InMemoryMarginProtocol {
    ledger: InMemoryLedger,
    state: Arc<RwLock<ProtocolState>>,
}

impl InMemoryMarginProtocol {
    pub fn new(ledger: InMemoryLedger) -> Self {
        Self {
            ledger,
            state: Arc::new(RwLock::new(ProtocolState::default())),
        }
    }

    /// Open an account under `scope` controlled by `controller`.
    pub fn open_account(&self, scope: AccountScope, controller: Address) {
        self.state.write().controllers.insert(scope, controller);
    }

    /// Reassign account control (models an ownership transfer inside the
    /// protocol, which invalidates orders bound to the old controller).
    pub fn set_controller(&self, scope: AccountScope, controller: Address) {
        self.state.write().controllers.insert(scope, controller);
    }

    /// Grant `party` a standing permission to run batches on `scope`.
    pub fn permit(&self, scope: AccountScope, party: Address) {
        self.state
            .write()
            .permitted
            .entry(scope)
            .or_default()
            .insert(party);
    }

    /// Require the account to keep at least `floor` total units across all
    /// tokens after every instruction of a batch.
    pub fn set_solvency_floor(&self, scope: AccountScope, floor: u128) {
        self.state.write().solvency_floor.insert(scope, floor);
    }

    fn apply(
        &self,
        caller: Address,
        scope: AccountScope,
        instruction: &Instruction,
    ) -> Result<(), ProtocolError> {
        match *instruction {
            Instruction::AddCollateral { token, amount } => self
                .ledger
                // The protocol instance spends the caller's allowance.
                .transfer(scope.protocol, token, caller, scope.account, amount)
                .map_err(|_| ProtocolError::BatchRejected("collateral pull failed")),
            Instruction::Withdraw { token, amount, to } => self
                .ledger
                .transfer(scope.account, token, scope.account, to, amount)
                .map_err(|_| ProtocolError::BatchRejected("withdrawal exceeds account funds")),
        }
    }
}

impl MarginProtocol for InMemoryMarginProtocol {
    fn current_controller(&self, scope: AccountScope) -> Result<Address, ProtocolError> {
        self.state
            .read()
            .controllers
            .get(&scope)
            .copied()
            .ok_or(ProtocolError::UnknownAccount)
    }

    fn run_batch(
        &self,
        caller: Address,
        scope: AccountScope,
        instructions: &[Instruction],
    ) -> Result<(), ProtocolError> {
        let floor = {
            let state = self.state.read();
            if !state.controllers.contains_key(&scope) {
                return Err(ProtocolError::UnknownAccount);
            }
            let permitted = state
                .permitted
                .get(&scope)
                .map(|set| set.contains(&caller))
                .unwrap_or(false);
            if !permitted {
                return Err(ProtocolError::NotPermitted);
            }
            state.solvency_floor.get(&scope).copied().unwrap_or(0)
        };

        // All-or-nothing: apply in order against the live ledger, roll the
        // whole thing back on the first failure.
        let checkpoint = self.ledger.checkpoint();
        for instruction in instructions {
            if let Err(e) = self.apply(caller, scope, instruction) {
                self.ledger.revert(checkpoint);
                return Err(e);
            }
            if self.ledger.total_holdings(scope.account) < floor {
                self.ledger.revert(checkpoint);
                return Err(ProtocolError::BatchRejected("account below solvency floor"));
            }
        }
        Ok(())
    }
}
