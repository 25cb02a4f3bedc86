// ============================================================================
// Token Ledger Interface
// Fungible balance / transfer / approval primitives
// ============================================================================

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::domain::Address;

/// Errors surfaced by token primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// Token is not known to the ledger
    UnknownToken,
    /// `from` does not hold enough of the token
    InsufficientBalance,
    /// The caller's spending allowance does not cover the transfer
    InsufficientAllowance,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::UnknownToken => write!(f, "unknown token"),
            TokenError::InsufficientBalance => write!(f, "insufficient token balance"),
            TokenError::InsufficientAllowance => write!(f, "insufficient spending allowance"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Fungible-token primitives the engine settles through.
///
/// `caller` is the identity performing the call; a transfer where
/// `caller != from` consumes the `(from -> caller)` allowance.
pub trait TokenLedger: Send + Sync {
    fn balance_of(&self, holder: Address, token: Address) -> Result<u128, TokenError>;

    fn decimals(&self, token: Address) -> Result<u8, TokenError>;

    fn transfer(
        &self,
        caller: Address,
        token: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError>;

    fn approve(
        &self,
        caller: Address,
        token: Address,
        spender: Address,
        amount: u128,
    ) -> Result<(), TokenError>;
}

// ============================================================================
// In-Memory Reference Implementation
// ============================================================================

#[derive(Clone, Default)]
struct LedgerState {
    /// token -> decimal precision
    decimals: HashMap<Address, u8>,
    /// (token, holder) -> balance
    balances: HashMap<(Address, Address), u128>,
    /// (token, owner, spender) -> allowance
    allowances: HashMap<(Address, Address, Address), u128>,
}

/// Opaque snapshot of ledger state, used to restore after a rejected batch.
pub struct LedgerCheckpoint(LedgerState);

/// In-memory token ledger for tests and simulations. Cheap to clone; clones
/// share state.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token and its decimal precision.
    pub fn register_token(&self, token: Address, decimals: u8) {
        self.state.write().decimals.insert(token, decimals);
    }

    /// Credit `amount` of `token` to `holder` out of thin air.
    pub fn mint(&self, token: Address, holder: Address, amount: u128) {
        let mut state = self.state.write();
        *state.balances.entry((token, holder)).or_insert(0) += amount;
    }

    /// Remaining allowance granted by `owner` to `spender`.
    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> u128 {
        self.state
            .read()
            .allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of `holder`'s balances across all tokens, in raw native units.
    /// Unit-agnostic; only meaningful as a relative solvency gauge in mocks.
    pub fn total_holdings(&self, holder: Address) -> u128 {
        self.state
            .read()
            .balances
            .iter()
            .filter(|((_, h), _)| *h == holder)
            .map(|(_, amount)| amount)
            .sum()
    }

    /// Capture the full ledger state.
    pub fn checkpoint(&self) -> LedgerCheckpoint {
        LedgerCheckpoint(self.state.read().clone())
    }

    /// Restore a previously captured state, discarding everything since.
    pub fn revert(&self, checkpoint: LedgerCheckpoint) {
        *self.state.write() = checkpoint.0;
    }
}

impl TokenLedger for InMemoryLedger {
    fn balance_of(&self, holder: Address, token: Address) -> Result<u128, TokenError> {
        let state = self.state.read();
        if !state.decimals.contains_key(&token) {
            return Err(TokenError::UnknownToken);
        }
        Ok(state.balances.get(&(token, holder)).copied().unwrap_or(0))
    }

    fn decimals(&self, token: Address) -> Result<u8, TokenError> {
        self.state
            .read()
            .decimals
            .get(&token)
            .copied()
            .ok_or(TokenError::UnknownToken)
    }

    fn transfer(
        &self,
        caller: Address,
        token: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let mut state = self.state.write();
        if !state.decimals.contains_key(&token) {
            return Err(TokenError::UnknownToken);
        }

        let from_balance = state.balances.get(&(token, from)).copied().unwrap_or(0);
        if from_balance < amount {
            return Err(TokenError::InsufficientBalance);
        }

        // Delegated transfers consume the (from -> caller) allowance.
        if caller != from {
            let key = (token, from, caller);
            let allowance = state.allowances.get(&key).copied().unwrap_or(0);
            if allowance < amount {
                return Err(TokenError::InsufficientAllowance);
            }
            state.allowances.insert(key, allowance - amount);
        }

        state.balances.insert((token, from), from_balance - amount);
        *state.balances.entry((token, to)).or_insert(0) += amount;
        Ok(())
    }

    fn approve(
        &self,
        caller: Address,
        token: Address,
        spender: Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let mut state = self.state.write();
        if !state.decimals.contains_key(&token) {
            return Err(TokenError::UnknownToken);
        }
        state.allowances.insert((token, caller, spender), amount);
        Ok(())
    }
}
