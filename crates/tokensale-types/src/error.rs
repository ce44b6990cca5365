//! Error types for the token sale engine.
//!
//! All errors use the `TS_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Purchase / quote errors
//! - 2xx: Collaborator (token ledger, payment transport) errors
//! - 3xx: Settlement errors
//! - 9xx: General / internal errors

use rust_decimal::Decimal;
use thiserror::Error;

use crate::Address;

/// Central error enum for all token sale operations.
#[derive(Debug, Error)]
pub enum SaleError {
    // =================================================================
    // Purchase Errors (1xx)
    // =================================================================
    /// The attached payment does not cover a single token unit.
    #[error("TS_ERR_100: Payment too low: one unit costs {required}, sent {sent}")]
    InsufficientPayment { required: Decimal, sent: Decimal },

    /// The buyer already holds the per-buyer maximum.
    #[error("TS_ERR_101: Buyer {buyer} reached the per-buyer limit of {cap} units")]
    AllowanceExhausted { buyer: Address, cap: u64 },

    /// The sale holds no sellable units.
    #[error("TS_ERR_102: Sale inventory exhausted: {remaining} units remain")]
    InventoryExhausted { remaining: u64 },

    // =================================================================
    // Collaborator Errors (2xx)
    // =================================================================
    /// The token ledger refused the transfer.
    #[error("TS_ERR_200: Token transfer rejected: {reason}")]
    TransferRejected { reason: String },

    /// Not enough tokens in the source account.
    #[error("TS_ERR_201: Insufficient token balance: need {needed}, have {available}")]
    InsufficientTokenBalance { needed: u128, available: u128 },

    /// The payment transport refused to move native currency.
    #[error("TS_ERR_202: Payment rejected: {reason}")]
    PaymentRejected { reason: String },

    /// Not enough native currency in the source account.
    #[error("TS_ERR_203: Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    // =================================================================
    // Settlement Errors (3xx)
    // =================================================================
    /// Settlement could not be applied.
    #[error("TS_ERR_300: Settlement failed: {reason}")]
    SettlementFailed { reason: String },

    /// Settlement was invoked with a zero-unit allocation.
    #[error("TS_ERR_301: Settlement requires a non-empty allocation")]
    EmptyAllocation,

    /// Inventory or payment conservation broke. The sale must halt.
    #[error("TS_ERR_302: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("TS_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("TS_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, bad values, etc.).
    #[error("TS_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// Checked arithmetic overflowed.
    #[error("TS_ERR_903: Arithmetic overflow: {0}")]
    ArithmeticOverflow(String),
}

impl SaleError {
    /// Whether this error is a purchase rejection the buyer can act on
    /// (pay more, stop buying, wait for inventory).
    #[must_use]
    pub fn is_purchase_rejection(&self) -> bool {
        matches!(
            self,
            Self::InsufficientPayment { .. }
                | Self::AllowanceExhausted { .. }
                | Self::InventoryExhausted { .. }
        )
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, SaleError>;

impl From<serde_json::Error> for SaleError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_payment_display() {
        let err = SaleError::InsufficientPayment {
            required: Decimal::new(1, 1),
            sent: Decimal::new(1, 2),
        };
        let msg = format!("{err}");
        assert!(msg.starts_with("TS_ERR_100"), "Got: {msg}");
        assert!(msg.contains("0.1"));
        assert!(msg.contains("0.01"));
    }

    #[test]
    fn allowance_exhausted_carries_buyer_and_cap() {
        let buyer = Address::derive("buyer");
        let err = SaleError::AllowanceExhausted { buyer, cap: 10 };
        let msg = format!("{err}");
        assert!(msg.contains("TS_ERR_101"));
        assert!(msg.contains(&buyer.to_string()));
        assert!(msg.contains("10"));
    }

    #[test]
    fn purchase_rejections_are_classified() {
        assert!(SaleError::InventoryExhausted { remaining: 0 }.is_purchase_rejection());
        assert!(!SaleError::EmptyAllocation.is_purchase_rejection());
        assert!(!SaleError::Internal("x".into()).is_purchase_rejection());
    }

    #[test]
    fn serde_json_errors_convert() {
        let err: SaleError = serde_json::from_str::<u64>("nope").unwrap_err().into();
        assert!(matches!(err, SaleError::Serialization(_)));
    }

    #[test]
    fn all_errors_have_ts_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(SaleError::InventoryExhausted { remaining: 0 }),
            Box::new(SaleError::TransferRejected { reason: "paused".into() }),
            Box::new(SaleError::InsufficientTokenBalance {
                needed: 10,
                available: 5,
            }),
            Box::new(SaleError::EmptyAllocation),
            Box::new(SaleError::ArithmeticOverflow("price".into())),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("TS_ERR_"),
                "Error missing TS_ERR_ prefix: {msg}"
            );
        }
    }
}
