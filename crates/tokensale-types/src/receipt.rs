//! Settlement receipts for the purchase audit trail.
//!
//! Every successful purchase produces a [`SettlementResult`]. Its digest is a
//! SHA-256 over the economic fields so two parties can compare receipts
//! without trusting each other's serialization.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{constants, Address, Allocation, PurchaseId};

/// Proof that one purchase was settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementResult {
    /// Unique purchase identifier.
    pub purchase_id: PurchaseId,
    /// The account that paid and received the tokens.
    pub buyer: Address,
    /// Units granted, payment retained, payment refunded.
    pub allocation: Allocation,
    /// Token base units moved to the buyer (`granted_units * 10^decimals`).
    pub base_units: u128,
    /// Buyer's cumulative allocation after this purchase.
    pub buyer_total_units: u64,
    /// Whole units still held by the sale after this purchase.
    pub inventory_after: u64,
    /// When the settlement was applied.
    pub settled_at: DateTime<Utc>,
}

impl SettlementResult {
    #[must_use]
    pub fn granted_units(&self) -> u64 {
        self.allocation.granted_units
    }

    #[must_use]
    pub fn owed_payment(&self) -> Decimal {
        self.allocation.owed_payment
    }

    #[must_use]
    pub fn refund(&self) -> Decimal {
        self.allocation.refund
    }

    /// SHA-256 over purchase id, buyer, and the economic fields.
    /// The timestamp is excluded.
    #[must_use]
    pub fn digest(&self) -> [u8; 32] {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(constants::RECEIPT_DOMAIN);
        hasher.update(self.purchase_id.0.as_bytes());
        hasher.update(self.buyer.as_bytes());
        hasher.update(self.allocation.granted_units.to_le_bytes());
        hasher.update(self.allocation.owed_payment.serialize());
        hasher.update(self.allocation.refund.serialize());
        hasher.update(self.base_units.to_le_bytes());
        hasher.update(self.buyer_total_units.to_le_bytes());
        hasher.update(self.inventory_after.to_le_bytes());
        hasher.finalize().into()
    }

    #[must_use]
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest())
    }
}

impl std::fmt::Display for SettlementResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Settlement[{}] {} +{} units paid {} refunded {}",
            self.purchase_id,
            self.buyer,
            self.allocation.granted_units,
            self.allocation.owed_payment,
            self.allocation.refund,
        )
    }
}
