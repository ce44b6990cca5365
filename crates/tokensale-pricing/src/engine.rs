//! Fixed-price allocation.
//!
//! Converts an attached payment into whole token units:
//! ```text
//! requested = floor(payment / unit_price)
//! granted   = min(requested, max_per_buyer - already_bought, inventory)
//! owed      = granted * unit_price
//! refund    = payment - owed
//! ```
//! The engine is pure: it reads nothing but its arguments and writes nothing.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokensale_types::{Address, Allocation, Result, SaleConfig, SaleError};

use crate::units::UnitScale;

/// Prices payments against a validated [`SaleConfig`].
#[derive(Debug, Clone)]
pub struct PricingEngine {
    config: SaleConfig,
    scale: UnitScale,
}

impl PricingEngine {
    /// # Errors
    /// Returns `Configuration` if the config does not validate.
    pub fn new(config: SaleConfig) -> Result<Self> {
        config.validate()?;
        let scale = UnitScale::new(config.decimals)?;
        Ok(Self { config, scale })
    }

    #[must_use]
    pub fn config(&self) -> &SaleConfig {
        &self.config
    }

    #[must_use]
    pub fn scale(&self) -> UnitScale {
        self.scale
    }

    #[must_use]
    pub fn unit_price(&self) -> Decimal {
        self.config.unit_price
    }

    #[must_use]
    pub fn max_per_buyer(&self) -> u64 {
        self.config.max_per_buyer
    }

    /// Units the buyer may still acquire.
    #[must_use]
    pub fn remaining_allowance(&self, allocated_so_far: u64) -> u64 {
        self.config.max_per_buyer.saturating_sub(allocated_so_far)
    }

    /// Exact price of `units` whole units.
    ///
    /// # Errors
    /// Returns `ArithmeticOverflow` if the product leaves `Decimal` range.
    pub fn price_of(&self, units: u64) -> Result<Decimal> {
        Decimal::from(units)
            .checked_mul(self.config.unit_price)
            .ok_or_else(|| {
                SaleError::ArithmeticOverflow(format!(
                    "{units} units * {}",
                    self.config.unit_price
                ))
            })
    }

    /// Whole units a payment can buy, ignoring caps.
    fn affordable_units(&self, payment: Decimal) -> u64 {
        let Some(ratio) = payment.checked_div(self.config.unit_price) else {
            return u64::MAX;
        };
        let mut units = ratio.floor().to_u64().unwrap_or(u64::MAX);
        // Decimal division rounds at 28 digits; never charge more than was sent.
        if units > 0 && self.price_of(units).is_ok_and(|owed| owed > payment) {
            units -= 1;
        }
        units
    }

    /// Quote a purchase.
    ///
    /// Checks run in a fixed order: payment floor, buyer allowance, inventory.
    ///
    /// # Errors
    /// - `InsufficientPayment` if `payment < unit_price`
    /// - `AllowanceExhausted` if the buyer already holds `max_per_buyer`
    /// - `InventoryExhausted` if `remaining_inventory == 0`
    pub fn quote(
        &self,
        buyer: Address,
        payment: Decimal,
        allocated_so_far: u64,
        remaining_inventory: u64,
    ) -> Result<Allocation> {
        let unit_price = self.config.unit_price;
        if payment < unit_price {
            return Err(SaleError::InsufficientPayment {
                required: unit_price,
                sent: payment,
            });
        }

        let requested = self.affordable_units(payment);

        let allowance = self.remaining_allowance(allocated_so_far);
        if allowance == 0 {
            return Err(SaleError::AllowanceExhausted {
                buyer,
                cap: self.config.max_per_buyer,
            });
        }

        let granted = requested.min(allowance).min(remaining_inventory);
        if remaining_inventory == 0 {
            return Err(SaleError::InventoryExhausted { remaining: 0 });
        }

        let owed_payment = self.price_of(granted)?;
        let refund = payment - owed_payment;
        if payment - refund != owed_payment {
            return Err(SaleError::ArithmeticOverflow(format!(
                "refund {refund} of {payment} loses precision against owed {owed_payment}"
            )));
        }

        tracing::debug!(
            buyer = %buyer.short(),
            %payment,
            requested,
            allowance,
            inventory = remaining_inventory,
            granted,
            %owed_payment,
            %refund,
            "Purchase quoted"
        );

        Ok(Allocation {
            granted_units: granted,
            owed_payment,
            refund,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> PricingEngine {
        PricingEngine::new(SaleConfig::new(Decimal::new(1, 1), 10, 18)).unwrap()
    }

    fn eth(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn buyer() -> Address {
        Address::derive("buyer")
    }

    #[test]
    fn payment_below_one_unit_is_rejected() {
        let err = engine().quote(buyer(), eth("0.01"), 0, 20).unwrap_err();
        match err {
            SaleError::InsufficientPayment { required, sent } => {
                assert_eq!(required, eth("0.1"));
                assert_eq!(sent, eth("0.01"));
            }
            other => panic!("expected InsufficientPayment, got {other:?}"),
        }
    }

    #[test]
    fn zero_and_negative_payments_are_rejected() {
        assert!(matches!(
            engine().quote(buyer(), Decimal::ZERO, 0, 20),
            Err(SaleError::InsufficientPayment { .. })
        ));
        assert!(matches!(
            engine().quote(buyer(), eth("-5"), 0, 20),
            Err(SaleError::InsufficientPayment { .. })
        ));
    }

    #[test]
    fn exact_unit_price_buys_one_unit() {
        let a = engine().quote(buyer(), eth("0.1"), 0, 20).unwrap();
        assert_eq!(a.granted_units, 1);
        assert_eq!(a.owed_payment, eth("0.1"));
        assert_eq!(a.refund, Decimal::ZERO);
    }

    #[test]
    fn overpayment_is_capped_by_allowance() {
        let a = engine().quote(buyer(), eth("2.0"), 0, 20).unwrap();
        assert_eq!(a.granted_units, 10);
        assert_eq!(a.owed_payment, eth("1.0"));
        assert_eq!(a.refund, eth("1.0"));
    }

    #[test]
    fn partial_unit_remainder_is_refunded() {
        let a = engine().quote(buyer(), eth("0.35"), 0, 20).unwrap();
        assert_eq!(a.granted_units, 3);
        assert_eq!(a.owed_payment, eth("0.3"));
        assert_eq!(a.refund, eth("0.05"));
    }

    #[test]
    fn remaining_allowance_limits_second_purchase() {
        let a = engine().quote(buyer(), eth("2"), 5, 20).unwrap();
        assert_eq!(a.granted_units, 5);
        assert_eq!(a.owed_payment, eth("0.5"));
        assert_eq!(a.refund, eth("1.5"));
    }

    #[test]
    fn exhausted_allowance_is_rejected() {
        let err = engine().quote(buyer(), eth("1.0"), 10, 20).unwrap_err();
        match err {
            SaleError::AllowanceExhausted { buyer: b, cap } => {
                assert_eq!(b, buyer());
                assert_eq!(cap, 10);
            }
            other => panic!("expected AllowanceExhausted, got {other:?}"),
        }
    }

    #[test]
    fn allocation_above_cap_is_still_exhausted() {
        assert!(matches!(
            engine().quote(buyer(), eth("1.0"), 11, 20),
            Err(SaleError::AllowanceExhausted { .. })
        ));
    }

    #[test]
    fn inventory_limits_grant() {
        let a = engine().quote(buyer(), eth("1.0"), 0, 5).unwrap();
        assert_eq!(a.granted_units, 5);
        assert_eq!(a.owed_payment, eth("0.5"));
        assert_eq!(a.refund, eth("0.5"));
    }

    #[test]
    fn empty_inventory_is_rejected_with_zero() {
        let err = engine().quote(buyer(), eth("1.0"), 0, 0).unwrap_err();
        assert!(matches!(err, SaleError::InventoryExhausted { remaining: 0 }));
    }

    #[test]
    fn allowance_is_checked_before_inventory() {
        let err = engine().quote(buyer(), eth("1.0"), 10, 0).unwrap_err();
        assert!(matches!(err, SaleError::AllowanceExhausted { .. }));
    }

    #[test]
    fn payment_is_checked_before_everything() {
        let err = engine().quote(buyer(), eth("0.05"), 10, 0).unwrap_err();
        assert!(matches!(err, SaleError::InsufficientPayment { .. }));
    }

    #[test]
    fn awkward_price_never_overcharges() {
        let engine = PricingEngine::new(SaleConfig::new(eth("0.3333333333333333333333333333"), 100, 0))
            .unwrap();
        let a = engine.quote(buyer(), eth("1"), 0, 100).unwrap();
        assert_eq!(a.granted_units, 3);
        assert!(a.owed_payment <= eth("1"));
        assert_eq!(a.owed_payment + a.refund, eth("1"));
    }

    #[test]
    fn enormous_payment_saturates_request() {
        let engine = PricingEngine::new(SaleConfig::new(Decimal::ONE, u64::MAX, 0)).unwrap();
        let payment = eth("100000000000000000000");
        let a = engine.quote(buyer(), payment, 0, 7).unwrap();
        assert_eq!(a.granted_units, 7);
        assert_eq!(a.owed_payment, eth("7"));
        assert_eq!(a.owed_payment + a.refund, payment);
    }

    #[test]
    fn inexact_refund_is_refused() {
        let engine =
            PricingEngine::new(SaleConfig::new(Decimal::new(1, 1), 10, 0)).unwrap();
        let err = engine
            .quote(buyer(), Decimal::from_i128_with_scale(10_i128.pow(28), 0), 0, 7)
            .unwrap_err();
        assert!(matches!(err, SaleError::ArithmeticOverflow(_)));
    }

    #[test]
    fn price_of_is_exact() {
        assert_eq!(engine().price_of(7).unwrap(), eth("0.7"));
        assert_eq!(engine().price_of(0).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(PricingEngine::new(SaleConfig::new(Decimal::ZERO, 10, 18)).is_err());
    }

    #[test]
    fn randomized_quotes_conserve_payment() {
        use rand::{Rng, SeedableRng};
        let mut rng = rand::rngs::StdRng::seed_from_u64(0x5eed);
        let engine = engine();
        for _ in 0..2_000 {
            let payment = Decimal::new(rng.gen_range(0..=5_000), 3);
            let so_far = rng.gen_range(0..=12);
            let inventory = rng.gen_range(0..=25);
            match engine.quote(buyer(), payment, so_far, inventory) {
                Ok(a) => {
                    assert_eq!(a.owed_payment + a.refund, payment);
                    assert!(a.granted_units >= 1);
                    assert!(a.granted_units <= engine.remaining_allowance(so_far));
                    assert!(a.granted_units <= inventory);
                    assert!(a.refund >= Decimal::ZERO);
                }
                Err(SaleError::InsufficientPayment { .. }) => {
                    assert!(payment < engine.unit_price());
                }
                Err(SaleError::AllowanceExhausted { .. }) => assert!(so_far >= 10),
                Err(SaleError::InventoryExhausted { remaining }) => {
                    assert_eq!(remaining, 0);
                    assert_eq!(inventory, 0);
                }
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
    }
}
