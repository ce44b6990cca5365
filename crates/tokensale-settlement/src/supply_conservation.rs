//! Inventory and payment conservation checks.
//!
//! Enforced after every settlement:
//! ```text
//! inventory_after == inventory_before - base_units_sold
//! Σ payments_in   == Σ forwarded_to_treasury + Σ refunded
//! ```
//!
//! A violation means a collaborator moved funds the sale did not ask for.
//! The sale halts on the first one.

use rust_decimal::Decimal;
use tokensale_types::{Allocation, Result, SaleError};

/// Running totals of everything the sale has settled.
#[derive(Debug, Clone, Default)]
pub struct SupplyConservation {
    /// Base units transferred out of inventory.
    sold_base_units: u128,
    /// Whole units sold.
    sold_units: u128,
    /// Payments taken in from buyers.
    payments_in: Decimal,
    /// Payments forwarded to the treasury.
    forwarded: Decimal,
    /// Payments returned to buyers.
    refunded: Decimal,
    settlements: u64,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one applied settlement.
    pub fn record_settlement(&mut self, allocation: &Allocation, base_units: u128) {
        self.sold_base_units = self.sold_base_units.saturating_add(base_units);
        self.sold_units = self
            .sold_units
            .saturating_add(u128::from(allocation.granted_units));
        self.payments_in += allocation.payment();
        self.forwarded += allocation.owed_payment;
        self.refunded += allocation.refund;
        self.settlements += 1;
    }

    /// Verify one settlement moved exactly `base_units` out of inventory.
    ///
    /// # Errors
    /// Returns [`SaleError::SupplyInvariantViolation`] on any mismatch.
    pub fn verify_inventory_step(before: u128, after: u128, base_units: u128) -> Result<()> {
        let expected = before.checked_sub(base_units);
        if expected != Some(after) {
            return Err(SaleError::SupplyInvariantViolation {
                reason: format!(
                    "inventory went {before} -> {after}, expected {before} - {base_units}"
                ),
            });
        }
        Ok(())
    }

    /// Verify every payment taken in was forwarded or refunded.
    ///
    /// # Errors
    /// Returns [`SaleError::SupplyInvariantViolation`] if the totals diverge.
    pub fn verify_payments(&self) -> Result<()> {
        if self.payments_in != self.forwarded + self.refunded {
            return Err(SaleError::SupplyInvariantViolation {
                reason: format!(
                    "payments in {} != forwarded {} + refunded {}",
                    self.payments_in, self.forwarded, self.refunded
                ),
            });
        }
        Ok(())
    }

    /// Verify the sale's native escrow is back to where it started.
    ///
    /// # Errors
    /// Returns [`SaleError::SupplyInvariantViolation`] if the sale kept funds.
    pub fn verify_escrow(before: Decimal, after: Decimal) -> Result<()> {
        if before != after {
            return Err(SaleError::SupplyInvariantViolation {
                reason: format!("sale escrow went {before} -> {after}"),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn sold_base_units(&self) -> u128 {
        self.sold_base_units
    }

    #[must_use]
    pub fn sold_units(&self) -> u128 {
        self.sold_units
    }

    /// Total forwarded to the treasury.
    #[must_use]
    pub fn total_raised(&self) -> Decimal {
        self.forwarded
    }

    #[must_use]
    pub fn total_refunded(&self) -> Decimal {
        self.refunded
    }

    #[must_use]
    pub fn settlements(&self) -> u64 {
        self.settlements
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocation(units: u64, owed: i64, refund: i64) -> Allocation {
        Allocation {
            granted_units: units,
            owed_payment: Decimal::new(owed, 1),
            refund: Decimal::new(refund, 1),
        }
    }

    #[test]
    fn empty_tracker_balances() {
        let sc = SupplyConservation::new();
        assert!(sc.verify_payments().is_ok());
        assert_eq!(sc.settlements(), 0);
        assert_eq!(sc.total_raised(), Decimal::ZERO);
    }

    #[test]
    fn records_accumulate() {
        let mut sc = SupplyConservation::new();
        sc.record_settlement(&allocation(10, 10, 10), 10);
        sc.record_settlement(&allocation(5, 5, 0), 5);
        assert_eq!(sc.sold_units(), 15);
        assert_eq!(sc.sold_base_units(), 15);
        assert_eq!(sc.total_raised(), Decimal::new(15, 1));
        assert_eq!(sc.total_refunded(), Decimal::ONE);
        assert_eq!(sc.settlements(), 2);
        assert!(sc.verify_payments().is_ok());
    }

    #[test]
    fn inventory_step_passes_when_exact() {
        assert!(SupplyConservation::verify_inventory_step(20, 10, 10).is_ok());
        assert!(SupplyConservation::verify_inventory_step(5, 0, 5).is_ok());
    }

    #[test]
    fn inventory_step_fails_on_mismatch() {
        let err = SupplyConservation::verify_inventory_step(20, 11, 10).unwrap_err();
        assert!(matches!(err, SaleError::SupplyInvariantViolation { .. }));
        assert!(SupplyConservation::verify_inventory_step(5, 0, 6).is_err());
    }

    #[test]
    fn escrow_must_return_to_start() {
        assert!(SupplyConservation::verify_escrow(Decimal::ZERO, Decimal::ZERO).is_ok());
        assert!(SupplyConservation::verify_escrow(Decimal::ZERO, Decimal::ONE).is_err());
    }
}
