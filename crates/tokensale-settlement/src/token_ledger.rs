//! Token ledger seam and its in-memory implementation.
//!
//! The sale never caches its inventory: it asks the token ledger for
//! `balance_of(sale)` every time it prices a purchase.

use std::collections::{HashMap, HashSet};

use tokensale_types::{Address, Result, SaleError};

/// Address-keyed token balances, in base units.
///
/// `transfer` must succeed whenever `check_transfer` passed for the same
/// arguments and no other mutation happened in between. Settlement relies on
/// this to validate the whole effect set before applying any of it.
pub trait TokenLedger {
    /// Balance of `owner` in base units.
    fn balance_of(&self, owner: &Address) -> u128;

    /// Total base units in existence.
    fn total_supply(&self) -> u128;

    /// Validate a transfer without applying it.
    fn check_transfer(&self, from: &Address, to: &Address, amount: u128) -> Result<()>;

    /// Move `amount` base units from `from` to `to`.
    fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<()>;
}

/// In-memory token ledger. The whole supply is minted to one holder at
/// genesis; afterwards balances only move.
///
/// Transfers can be refused globally (`pause`) or per recipient (`block`).
#[derive(Debug, Clone)]
pub struct InMemoryTokenLedger {
    /// Per-account balances in base units.
    balances: HashMap<Address, u128>,
    /// Fixed at genesis.
    total_supply: u128,
    paused: bool,
    blocked: HashSet<Address>,
}

impl InMemoryTokenLedger {
    /// Mint `supply` base units to `holder`.
    #[must_use]
    pub fn with_supply(holder: Address, supply: u128) -> Self {
        let mut balances = HashMap::new();
        if supply > 0 {
            balances.insert(holder, supply);
        }
        Self {
            balances,
            total_supply: supply,
            paused: false,
            blocked: HashSet::new(),
        }
    }

    /// Refuse every transfer until [`Self::unpause`].
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn unpause(&mut self) {
        self.paused = false;
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Refuse transfers to `account`.
    pub fn block(&mut self, account: Address) {
        self.blocked.insert(account);
    }

    pub fn unblock(&mut self, account: &Address) {
        self.blocked.remove(account);
    }

    /// Sum of all balances. Equals `total_supply` unless the ledger is broken.
    #[must_use]
    pub fn circulating(&self) -> u128 {
        self.balances.values().sum()
    }
}

impl TokenLedger for InMemoryTokenLedger {
    fn balance_of(&self, owner: &Address) -> u128 {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    fn total_supply(&self) -> u128 {
        self.total_supply
    }

    fn check_transfer(&self, from: &Address, to: &Address, amount: u128) -> Result<()> {
        if self.paused {
            return Err(SaleError::TransferRejected {
                reason: "token ledger is paused".to_string(),
            });
        }
        if self.blocked.contains(to) {
            return Err(SaleError::TransferRejected {
                reason: format!("recipient {to} is blocked"),
            });
        }
        let available = self.balance_of(from);
        if available < amount {
            return Err(SaleError::InsufficientTokenBalance {
                needed: amount,
                available,
            });
        }
        Ok(())
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<()> {
        self.check_transfer(from, to, amount)?;
        if amount == 0 || from == to {
            return Ok(());
        }
        // Checked above: from holds at least `amount`.
        if let Some(src) = self.balances.get_mut(from) {
            *src -= amount;
        }
        *self.balances.entry(*to).or_insert(0) += amount;
        Ok(())
    }
}
