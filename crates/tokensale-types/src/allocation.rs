//! The outcome of pricing one payment.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How a payment splits into granted units, retained payment, and refund.
///
/// Produced by the pricing engine; `owed_payment + refund` always equals the
/// payment that was quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Whole token units the buyer receives.
    pub granted_units: u64,
    /// Payment retained and forwarded to the treasury.
    pub owed_payment: Decimal,
    /// Payment returned to the buyer.
    pub refund: Decimal,
}

impl Allocation {
    /// The payment this allocation was computed from.
    #[must_use]
    pub fn payment(&self) -> Decimal {
        self.owed_payment + self.refund
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.granted_units == 0
    }

    #[must_use]
    pub fn has_refund(&self) -> bool {
        self.refund > Decimal::ZERO
    }
}
