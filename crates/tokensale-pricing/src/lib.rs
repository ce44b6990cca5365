//! # tokensale-pricing
//!
//! **Pricing & Allocation Engine**: turns an attached payment into a number
//! of whole token units at a fixed unit price.
//!
//! The grant is clamped twice, by the buyer's remaining allowance and by the
//! sale's remaining inventory. Whatever part of the payment does not buy a
//! granted unit is returned as a refund, so `owed + refund == payment`.
//!
//! ```text
//! payment ──► PricingEngine::quote(buyer, payment, bought_so_far, inventory)
//!                 └─► Allocation { granted_units, owed_payment, refund }
//! ```
//!
//! The engine never touches ledgers; settlement lives in `tokensale-settlement`.

pub mod engine;
pub mod units;

pub use engine::PricingEngine;
pub use units::UnitScale;
