//! System-wide constants for the token sale engine.

use rust_decimal::Decimal;

/// Default price of one whole token unit in native currency (0.1).
pub const DEFAULT_UNIT_PRICE: Decimal = Decimal::from_parts(1, 0, 0, false, 1);

/// Default per-buyer ceiling in whole token units.
pub const DEFAULT_MAX_PER_BUYER: u64 = 10;

/// Default token decimals (base units per whole unit = 10^decimals).
pub const DEFAULT_DECIMALS: u32 = 18;

/// Largest supported `decimals`; 10^36 still fits a `u128` with headroom.
pub const MAX_DECIMALS: u32 = 36;

/// Number of settlement receipts a sale keeps in memory before dropping the oldest.
pub const MAX_RECEIPT_HISTORY: usize = 10_000;

/// Domain separator for settlement receipt digests.
pub const RECEIPT_DOMAIN: &[u8] = b"tokensale:settlement:v1:";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Tokensale";
