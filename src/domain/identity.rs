// ============================================================================
// Identity Value Objects
// ============================================================================

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Opaque 20-byte identity for users, tokens and protocol instances.
///
/// The all-zero address is reserved as the "nobody" / sentinel value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address, used as the empty sentinel.
    pub const ZERO: Self = Self([0u8; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Build an address from a small integer (big-endian in the low bytes).
    /// Convenient for tests and demos.
    pub const fn from_low_u64(value: u64) -> Self {
        let mut bytes = [0u8; 20];
        let v = value.to_be_bytes();
        let mut i = 0;
        while i < 8 {
            bytes[12 + i] = v[i];
            i += 1;
        }
        Self(bytes)
    }

    pub const fn is_zero(&self) -> bool {
        let mut i = 0;
        while i < 20 {
            if self.0[i] != 0 {
                return false;
            }
            i += 1;
        }
        true
    }

    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// The (margin protocol instance, margin account) pair an order acts upon.
///
/// An order is only valid while its owner still controls this exact account;
/// the empty scope doubles as the destroyed-order read sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AccountScope {
    /// The margin protocol instance (e.g. a specific credit manager).
    pub protocol: Address,
    /// The specific margin account within that instance.
    pub account: Address,
}

impl AccountScope {
    pub const EMPTY: Self = Self {
        protocol: Address::ZERO,
        account: Address::ZERO,
    };

    pub const fn new(protocol: Address, account: Address) -> Self {
        Self { protocol, account }
    }

    pub const fn is_empty(&self) -> bool {
        self.protocol.is_zero() && self.account.is_zero()
    }
}
