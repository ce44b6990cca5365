//! Purchase entry point.
//!
//! [`TokenSale::buy`] reads inventory from the token ledger, quotes the
//! payment, and settles the allocation, all while holding one mutex. Two
//! purchases never observe each other's intermediate state.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use rust_decimal::Decimal;
use tokensale_pricing::PricingEngine;
use tokensale_types::{
    constants, Address, Allocation, DeploymentConfig, Result, SaleError, SettlementResult,
};

use crate::payment::PaymentTransport;
use crate::settler::SettlementLedger;
use crate::token_ledger::TokenLedger;

/// Everything a purchase mutates.
struct SaleState<L, P> {
    tokens: L,
    payments: P,
    ledger: SettlementLedger,
    receipts: VecDeque<SettlementResult>,
    /// Set on the first conservation violation; no purchase succeeds afterwards.
    halted: Option<String>,
}

/// A fixed-price token sale over a token ledger and a payment transport.
pub struct TokenSale<L, P> {
    deployment: DeploymentConfig,
    engine: PricingEngine,
    state: Mutex<SaleState<L, P>>,
}

impl<L, P> TokenSale<L, P>
where
    L: TokenLedger,
    P: PaymentTransport,
{
    /// Deploy a sale. Inventory is whatever the token ledger credits to
    /// `deployment.sale`, now or later.
    ///
    /// # Errors
    /// Returns `Configuration` if the deployment does not validate.
    pub fn new(deployment: DeploymentConfig, tokens: L, payments: P) -> Result<Self> {
        deployment.validate()?;
        let engine = PricingEngine::new(deployment.pricing.clone())?;
        let ledger = SettlementLedger::new(
            deployment.sale,
            deployment.treasury,
            engine.max_per_buyer(),
            engine.scale(),
        );

        tracing::info!(
            sale = %deployment.sale,
            token = %deployment.token,
            treasury = %deployment.treasury,
            unit_price = %engine.unit_price(),
            max_per_buyer = engine.max_per_buyer(),
            decimals = deployment.pricing.decimals,
            "{} {} sale deployed",
            constants::ENGINE_NAME,
            constants::VERSION
        );

        Ok(Self {
            deployment,
            engine,
            state: Mutex::new(SaleState {
                tokens,
                payments,
                ledger,
                receipts: VecDeque::new(),
                halted: None,
            }),
        })
    }

    fn state(&self) -> Result<MutexGuard<'_, SaleState<L, P>>> {
        self.state
            .lock()
            .map_err(|_| SaleError::Internal("sale state lock poisoned".to_string()))
    }

    /// Buy tokens with `payment` attached.
    ///
    /// On success the buyer holds the granted units, the treasury holds the
    /// owed payment, and the buyer got the refund back. On failure nothing
    /// moved and the payment never left the buyer.
    ///
    /// # Errors
    /// - `InsufficientPayment`, `AllowanceExhausted`, `InventoryExhausted`
    ///   from pricing
    /// - collaborator refusals from settlement
    /// - `SupplyInvariantViolation` if the sale is halted
    pub fn buy(&self, buyer: Address, payment: Decimal) -> Result<SettlementResult> {
        let mut guard = self.state()?;
        let state = &mut *guard;

        if let Some(reason) = &state.halted {
            return Err(SaleError::SupplyInvariantViolation {
                reason: format!("sale halted: {reason}"),
            });
        }

        let inventory = self
            .engine
            .scale()
            .whole_units(state.tokens.balance_of(&self.deployment.sale));
        let allocated = state.ledger.allocation_of(&buyer);

        let allocation = self
            .engine
            .quote(buyer, payment, allocated, inventory)
            .inspect_err(|err| {
                tracing::warn!(
                    buyer = %buyer.short(),
                    %payment,
                    allocated,
                    inventory,
                    error = %err,
                    "Purchase rejected"
                );
            })?;

        let receipt = match state.ledger.settle(
            &mut state.tokens,
            &mut state.payments,
            buyer,
            allocation,
        ) {
            Ok(receipt) => receipt,
            Err(SaleError::SupplyInvariantViolation { reason }) => {
                tracing::error!(buyer = %buyer, %reason, "Conservation violated, halting sale");
                state.halted = Some(reason.clone());
                return Err(SaleError::SupplyInvariantViolation { reason });
            }
            Err(err) => {
                tracing::warn!(
                    buyer = %buyer.short(),
                    %payment,
                    error = %err,
                    "Settlement refused"
                );
                return Err(err);
            }
        };

        tracing::info!(
            purchase = %receipt.purchase_id,
            buyer = %buyer.short(),
            units = receipt.granted_units(),
            owed = %receipt.owed_payment(),
            refund = %receipt.refund(),
            inventory_after = receipt.inventory_after,
            digest = %receipt.digest_hex(),
            "Purchase settled"
        );

        if state.receipts.len() >= constants::MAX_RECEIPT_HISTORY {
            state.receipts.pop_front();
        }
        state.receipts.push_back(receipt.clone());
        Ok(receipt)
    }

    /// Price a purchase against current state without settling it.
    ///
    /// # Errors
    /// Same pricing errors as [`Self::buy`].
    pub fn quote(&self, buyer: Address, payment: Decimal) -> Result<Allocation> {
        let state = self.state()?;
        let inventory = self
            .engine
            .scale()
            .whole_units(state.tokens.balance_of(&self.deployment.sale));
        self.engine
            .quote(buyer, payment, state.ledger.allocation_of(&buyer), inventory)
    }

    // -----------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------

    #[must_use]
    pub fn max_per_buyer(&self) -> u64 {
        self.engine.max_per_buyer()
    }

    #[must_use]
    pub fn unit_price(&self) -> Decimal {
        self.engine.unit_price()
    }

    #[must_use]
    pub fn decimals(&self) -> u32 {
        self.deployment.pricing.decimals
    }

    #[must_use]
    pub fn treasury(&self) -> Address {
        self.deployment.treasury
    }

    /// Address of the token ledger holding the inventory.
    #[must_use]
    pub fn token(&self) -> Address {
        self.deployment.token
    }

    #[must_use]
    pub fn owner(&self) -> Address {
        self.deployment.owner
    }

    #[must_use]
    pub fn sale_address(&self) -> Address {
        self.deployment.sale
    }

    #[must_use]
    pub fn deployment(&self) -> &DeploymentConfig {
        &self.deployment
    }

    /// Payment retained by the most recent purchase (0 before the first).
    pub fn incoming_amount(&self) -> Result<Decimal> {
        Ok(self.state()?.ledger.incoming_amount())
    }

    /// Units bought by `buyer` so far.
    pub fn allocation_of(&self, buyer: &Address) -> Result<u64> {
        Ok(self.state()?.ledger.allocation_of(buyer))
    }

    /// Whole units the sale can still sell, read from the token ledger.
    pub fn remaining_inventory(&self) -> Result<u64> {
        let state = self.state()?;
        Ok(self
            .engine
            .scale()
            .whole_units(state.tokens.balance_of(&self.deployment.sale)))
    }

    /// Number of settled purchases.
    pub fn purchase_count(&self) -> Result<u64> {
        Ok(self.state()?.ledger.supply().settlements())
    }

    /// Total payment forwarded to the treasury.
    pub fn total_raised(&self) -> Result<Decimal> {
        Ok(self.state()?.ledger.supply().total_raised())
    }

    /// Most recent receipts, oldest first.
    pub fn receipts(&self) -> Result<Vec<SettlementResult>> {
        Ok(self.state()?.receipts.iter().cloned().collect())
    }

    /// Reason the sale halted, if it did.
    pub fn halted(&self) -> Result<Option<String>> {
        Ok(self.state()?.halted.clone())
    }

    /// Run `f` with read access to the collaborators.
    pub fn with_ledgers<R>(&self, f: impl FnOnce(&L, &P) -> R) -> Result<R> {
        let state = self.state()?;
        Ok(f(&state.tokens, &state.payments))
    }

    /// Run `f` with write access to the collaborators, under the sale lock.
    /// Used to fund inventory or move balances outside a purchase.
    pub fn with_ledgers_mut<R>(&self, f: impl FnOnce(&mut L, &mut P) -> R) -> Result<R> {
        let mut guard = self.state()?;
        let state = &mut *guard;
        Ok(f(&mut state.tokens, &mut state.payments))
    }
}
