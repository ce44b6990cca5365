//! # tokensale-settlement
//!
//! **Settlement Ledger**: buyer allocations, staged three-way transfers,
//! conservation checks, and the purchase entry point.
//!
//! ## Architecture
//!
//! [`TokenSale::buy`] runs one purchase under the sale lock:
//! 1. Read inventory from the [`TokenLedger`] (never cached)
//! 2. Quote the payment with the pricing engine
//! 3. Stage a [`SettlementPlan`] and validate every effect
//! 4. Apply: payment in, tokens out, treasury payment, refund
//! 5. Record the buyer allocation and incoming amount
//! 6. Check inventory and payment conservation
//!
//! A purchase either fully commits or leaves every balance untouched.
//!
//! ## Collaborators
//!
//! - [`TokenLedger`]: address-keyed token balances (inventory source)
//! - [`PaymentTransport`]: native-currency movement to treasury and refunds
//!
//! In-memory implementations of both are provided for tests and simulation.

pub mod allocation_book;
pub mod payment;
pub mod plan;
pub mod sale;
pub mod settler;
pub mod supply_conservation;
pub mod token_ledger;

pub use allocation_book::AllocationBook;
pub use payment::{InMemoryPaymentTransport, PaymentTransport};
pub use plan::{Effect, SettlementPlan};
pub use sale::TokenSale;
pub use settler::SettlementLedger;
pub use supply_conservation::SupplyConservation;
pub use token_ledger::{InMemoryTokenLedger, TokenLedger};
