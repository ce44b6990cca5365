//! # tokensale-types
//!
//! Shared types, errors, and configuration for the **Tokensale** engine.
//!
//! This crate is the leaf dependency of the workspace. It defines:
//!
//! - **Identifiers**: [`Address`], [`PurchaseId`]
//! - **Configuration**: [`SaleConfig`], [`DeploymentConfig`]
//! - **Pricing output**: [`Allocation`]
//! - **Receipts**: [`SettlementResult`]
//! - **Errors**: [`SaleError`] with `TS_ERR_` prefix codes
//! - **Constants**: defaults and limits

pub mod allocation;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod receipt;

pub use allocation::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use receipt::*;

// Constants are accessed via `tokensale_types::constants::FOO`.
