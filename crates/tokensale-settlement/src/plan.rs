//! Staged settlement: compute the full effect set, validate it, then apply.
//!
//! A purchase moves value four times:
//! 1. payment in      buyer    → sale      (the attached payment)
//! 2. tokens out      sale     → buyer     (granted units, in base units)
//! 3. treasury        sale     → treasury  (owed payment)
//! 4. refund          sale     → buyer     (remainder, omitted when zero)
//!
//! [`SettlementPlan::validate`] checks every effect against the collaborators
//! before [`SettlementPlan::apply`] touches any of them.

use rust_decimal::Decimal;
use tokensale_types::{Address, Allocation, Result, SaleError};

use crate::payment::PaymentTransport;
use crate::token_ledger::TokenLedger;

/// One movement of value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Native currency from the buyer into the sale's escrow.
    PaymentIn {
        from: Address,
        to: Address,
        amount: Decimal,
    },
    /// Tokens from sale inventory to the buyer.
    TokensOut {
        from: Address,
        to: Address,
        base_units: u128,
    },
    /// Retained payment forwarded to the treasury.
    TreasuryPayment {
        from: Address,
        to: Address,
        amount: Decimal,
    },
    /// Excess payment returned to the buyer.
    Refund {
        from: Address,
        to: Address,
        amount: Decimal,
    },
}

/// A fully computed, not yet applied, settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementPlan {
    pub buyer: Address,
    pub allocation: Allocation,
    /// Token base units moved to the buyer.
    pub base_units: u128,
    /// Buyer's cumulative allocation once applied.
    pub buyer_total_after: u64,
    effects: Vec<Effect>,
}

impl SettlementPlan {
    /// Build the effect set for one purchase.
    ///
    /// # Errors
    /// - `EmptyAllocation` if no units were granted
    /// - `SettlementFailed` if the allocation is internally inconsistent or
    ///   the buyer is the sale itself
    pub fn stage(
        sale: Address,
        treasury: Address,
        buyer: Address,
        allocation: Allocation,
        base_units: u128,
        buyer_total_after: u64,
    ) -> Result<Self> {
        if allocation.is_empty() {
            return Err(SaleError::EmptyAllocation);
        }
        if buyer == sale {
            return Err(SaleError::SettlementFailed {
                reason: "the sale cannot buy from itself".to_string(),
            });
        }
        if allocation.owed_payment <= Decimal::ZERO || allocation.refund < Decimal::ZERO {
            return Err(SaleError::SettlementFailed {
                reason: format!(
                    "invalid split: owed {} refund {}",
                    allocation.owed_payment, allocation.refund
                ),
            });
        }

        let mut effects = vec![
            Effect::PaymentIn {
                from: buyer,
                to: sale,
                amount: allocation.payment(),
            },
            Effect::TokensOut {
                from: sale,
                to: buyer,
                base_units,
            },
            Effect::TreasuryPayment {
                from: sale,
                to: treasury,
                amount: allocation.owed_payment,
            },
        ];
        if allocation.has_refund() {
            effects.push(Effect::Refund {
                from: sale,
                to: buyer,
                amount: allocation.refund,
            });
        }

        Ok(Self {
            buyer,
            allocation,
            base_units,
            buyer_total_after,
            effects,
        })
    }

    #[must_use]
    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    /// Check every effect without applying any.
    ///
    /// Payouts from the sale are funded by the payment-in effect
    /// (`owed + refund == payment`), so only their recipients are checked.
    ///
    /// # Errors
    /// Propagates the first collaborator refusal.
    pub fn validate<L, P>(&self, tokens: &L, payments: &P) -> Result<()>
    where
        L: TokenLedger + ?Sized,
        P: PaymentTransport + ?Sized,
    {
        for effect in &self.effects {
            match *effect {
                Effect::PaymentIn { from, to, amount } => {
                    let available = payments.balance_of(&from);
                    if available < amount {
                        return Err(SaleError::InsufficientFunds {
                            needed: amount,
                            available,
                        });
                    }
                    payments.check_recipient(&to)?;
                }
                Effect::TokensOut {
                    from,
                    to,
                    base_units,
                } => tokens.check_transfer(&from, &to, base_units)?,
                Effect::TreasuryPayment { to, .. } | Effect::Refund { to, .. } => {
                    payments.check_recipient(&to)?;
                }
            }
        }
        Ok(())
    }

    /// Apply every effect in order.
    ///
    /// Call only after [`Self::validate`] succeeded under the same lock.
    ///
    /// # Errors
    /// A failure here means a collaborator broke its check/apply contract;
    /// it is reported as `SettlementFailed`.
    pub fn apply<L, P>(&self, tokens: &mut L, payments: &mut P) -> Result<()>
    where
        L: TokenLedger + ?Sized,
        P: PaymentTransport + ?Sized,
    {
        for (step, effect) in self.effects.iter().enumerate() {
            let outcome = match *effect {
                Effect::PaymentIn { from, to, amount }
                | Effect::TreasuryPayment { from, to, amount }
                | Effect::Refund { from, to, amount } => payments.send(&from, &to, amount),
                Effect::TokensOut {
                    from,
                    to,
                    base_units,
                } => tokens.transfer(&from, &to, base_units),
            };
            if let Err(err) = outcome {
                tracing::error!(
                    buyer = %self.buyer,
                    step,
                    effect = ?effect,
                    error = %err,
                    "Validated settlement effect failed to apply"
                );
                return Err(SaleError::SettlementFailed {
                    reason: format!("step {step} ({effect:?}) failed after validation: {err}"),
                });
            }
        }
        Ok(())
    }
}
