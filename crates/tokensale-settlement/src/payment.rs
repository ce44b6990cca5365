//! Native-currency transport seam and its in-memory implementation.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use tokensale_types::{Address, Result, SaleError};

/// Moves native currency between accounts.
///
/// `send` must succeed whenever the sender holds `amount` and
/// `check_recipient(to)` passed, absent any other mutation in between.
pub trait PaymentTransport {
    /// Native balance of `account`.
    fn balance_of(&self, account: &Address) -> Decimal;

    /// Whether `to` accepts incoming payments.
    fn check_recipient(&self, to: &Address) -> Result<()>;

    /// Move `amount` from `from` to `to`.
    fn send(&mut self, from: &Address, to: &Address, amount: Decimal) -> Result<()>;
}

/// In-memory native balances. Accounts can be marked as refusing payments
/// (a contract without a receive hook, a frozen treasury).
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentTransport {
    balances: HashMap<Address, Decimal>,
    refusing: HashSet<Address>,
}

impl InMemoryPaymentTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` out of thin air (test funding).
    pub fn deposit(&mut self, account: Address, amount: Decimal) {
        *self.balances.entry(account).or_insert(Decimal::ZERO) += amount;
    }

    /// Make `account` refuse incoming payments.
    pub fn refuse_payments(&mut self, account: Address) {
        self.refusing.insert(account);
    }

    pub fn accept_payments(&mut self, account: &Address) {
        self.refusing.remove(account);
    }

    /// Sum of every balance.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.balances.values().copied().sum()
    }
}

impl PaymentTransport for InMemoryPaymentTransport {
    fn balance_of(&self, account: &Address) -> Decimal {
        self.balances.get(account).copied().unwrap_or(Decimal::ZERO)
    }

    fn check_recipient(&self, to: &Address) -> Result<()> {
        if self.refusing.contains(to) {
            return Err(SaleError::PaymentRejected {
                reason: format!("{to} refuses payments"),
            });
        }
        Ok(())
    }

    fn send(&mut self, from: &Address, to: &Address, amount: Decimal) -> Result<()> {
        if amount < Decimal::ZERO {
            return Err(SaleError::PaymentRejected {
                reason: format!("negative amount {amount}"),
            });
        }
        self.check_recipient(to)?;
        let available = self.balance_of(from);
        if available < amount {
            return Err(SaleError::InsufficientFunds {
                needed: amount,
                available,
            });
        }
        if amount.is_zero() || from == to {
            return Ok(());
        }
        if let Some(src) = self.balances.get_mut(from) {
            *src -= amount;
        }
        *self.balances.entry(*to).or_insert(Decimal::ZERO) += amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eth(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn deposit_and_send() {
        let mut t = InMemoryPaymentTransport::new();
        let alice = Address::derive("alice");
        let bob = Address::derive("bob");
        t.deposit(alice, eth("2"));
        t.send(&alice, &bob, eth("0.5")).unwrap();
        assert_eq!(t.balance_of(&alice), eth("1.5"));
        assert_eq!(t.balance_of(&bob), eth("0.5"));
        assert_eq!(t.total(), eth("2"));
    }

    #[test]
    fn overspend_fails_unchanged() {
        let mut t = InMemoryPaymentTransport::new();
        let alice = Address::derive("alice");
        let bob = Address::derive("bob");
        t.deposit(alice, eth("1"));
        let err = t.send(&alice, &bob, eth("1.01")).unwrap_err();
        assert!(matches!(err, SaleError::InsufficientFunds { .. }));
        assert_eq!(t.balance_of(&alice), eth("1"));
        assert_eq!(t.balance_of(&bob), Decimal::ZERO);
    }

    #[test]
    fn refusing_recipient() {
        let mut t = InMemoryPaymentTransport::new();
        let alice = Address::derive("alice");
        let vault = Address::derive("vault");
        t.deposit(alice, eth("1"));
        t.refuse_payments(vault);
        assert!(matches!(
            t.send(&alice, &vault, eth("1")),
            Err(SaleError::PaymentRejected { .. })
        ));
        t.accept_payments(&vault);
        t.send(&alice, &vault, eth("1")).unwrap();
        assert_eq!(t.balance_of(&vault), eth("1"));
    }

    #[test]
    fn negative_amount_rejected() {
        let mut t = InMemoryPaymentTransport::new();
        let alice = Address::derive("alice");
        let bob = Address::derive("bob");
        assert!(t.send(&alice, &bob, eth("-1")).is_err());
    }
}
