//! The settlement ledger.
//!
//! Owns the buyer allocation book, the latest incoming amount, and the
//! conservation tracker. `settle` runs one purchase through
//! stage → validate → apply → record:
//! 1. Stage the plan (allocation cap checked here)
//! 2. Validate every effect against the collaborators
//! 3. Apply: payment in, tokens out, treasury payment, refund
//! 4. Record: buyer allocation, incoming amount, conservation totals
//! 5. Verify inventory and escrow conservation

use chrono::Utc;
use rust_decimal::Decimal;
use tokensale_pricing::UnitScale;
use tokensale_types::{Address, Allocation, PurchaseId, Result, SettlementResult};

use crate::allocation_book::AllocationBook;
use crate::payment::PaymentTransport;
use crate::plan::SettlementPlan;
use crate::supply_conservation::SupplyConservation;
use crate::token_ledger::TokenLedger;

/// Settles quoted purchases for one sale.
///
/// Nothing is written unless every effect validated. The caller is expected
/// to hold the sale lock for the whole call.
#[derive(Debug, Clone)]
pub struct SettlementLedger {
    sale: Address,
    treasury: Address,
    scale: UnitScale,
    book: AllocationBook,
    /// Payment retained by the latest purchase.
    incoming_amount: Decimal,
    supply: SupplyConservation,
}

impl SettlementLedger {
    #[must_use]
    pub fn new(sale: Address, treasury: Address, max_per_buyer: u64, scale: UnitScale) -> Self {
        Self {
            sale,
            treasury,
            scale,
            book: AllocationBook::new(max_per_buyer),
            incoming_amount: Decimal::ZERO,
            supply: SupplyConservation::new(),
        }
    }

    /// Units bought by `buyer` so far.
    #[must_use]
    pub fn allocation_of(&self, buyer: &Address) -> u64 {
        self.book.allocated(buyer)
    }

    /// Payment retained by the most recent purchase.
    #[must_use]
    pub fn incoming_amount(&self) -> Decimal {
        self.incoming_amount
    }

    #[must_use]
    pub fn book(&self) -> &AllocationBook {
        &self.book
    }

    #[must_use]
    pub fn supply(&self) -> &SupplyConservation {
        &self.supply
    }

    /// Build and validate the plan for a purchase without applying it.
    ///
    /// # Errors
    /// Any staging or validation failure.
    pub fn prepare<L, P>(
        &self,
        tokens: &L,
        payments: &P,
        buyer: Address,
        allocation: Allocation,
    ) -> Result<SettlementPlan>
    where
        L: TokenLedger + ?Sized,
        P: PaymentTransport + ?Sized,
    {
        let base_units = self.scale.to_base_units(allocation.granted_units)?;
        let buyer_total_after = self.book.stage(&buyer, allocation.granted_units)?;
        let plan = SettlementPlan::stage(
            self.sale,
            self.treasury,
            buyer,
            allocation,
            base_units,
            buyer_total_after,
        )?;
        plan.validate(tokens, payments)?;
        Ok(plan)
    }

    /// Settle one quoted purchase atomically.
    ///
    /// # Errors
    /// - `EmptyAllocation` for a zero-unit allocation
    /// - `SettlementFailed` if the buyer cap would be exceeded
    /// - collaborator refusals (`TransferRejected`, `PaymentRejected`, ...)
    /// - `SupplyInvariantViolation` if the collaborators moved the wrong amounts
    pub fn settle<L, P>(
        &mut self,
        tokens: &mut L,
        payments: &mut P,
        buyer: Address,
        allocation: Allocation,
    ) -> Result<SettlementResult>
    where
        L: TokenLedger + ?Sized,
        P: PaymentTransport + ?Sized,
    {
        let plan = self.prepare(&*tokens, &*payments, buyer, allocation)?;

        let inventory_before = tokens.balance_of(&self.sale);
        let escrow_before = payments.balance_of(&self.sale);

        plan.apply(tokens, payments)?;

        self.book.commit(buyer, plan.buyer_total_after);
        self.incoming_amount = allocation.owed_payment;
        self.supply.record_settlement(&allocation, plan.base_units);

        let inventory_after = tokens.balance_of(&self.sale);
        SupplyConservation::verify_inventory_step(
            inventory_before,
            inventory_after,
            plan.base_units,
        )?;
        SupplyConservation::verify_escrow(escrow_before, payments.balance_of(&self.sale))?;
        self.supply.verify_payments()?;

        Ok(SettlementResult {
            purchase_id: PurchaseId::new(),
            buyer,
            allocation,
            base_units: plan.base_units,
            buyer_total_units: plan.buyer_total_after,
            inventory_after: self.scale.whole_units(inventory_after),
            settled_at: Utc::now(),
        })
    }
}
