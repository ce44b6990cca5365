//! Conversion between whole token units and token-ledger base units.

use tokensale_types::{constants, Result, SaleError};

/// `10^decimals` scaling between whole units and base units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitScale {
    decimals: u32,
    factor: u128,
}

impl UnitScale {
    /// # Errors
    /// Returns `Configuration` if `decimals` exceeds [`constants::MAX_DECIMALS`].
    pub fn new(decimals: u32) -> Result<Self> {
        if decimals > constants::MAX_DECIMALS {
            return Err(SaleError::Configuration(format!(
                "decimals must be <= {}, got {decimals}",
                constants::MAX_DECIMALS
            )));
        }
        let factor = 10u128
            .checked_pow(decimals)
            .ok_or_else(|| SaleError::ArithmeticOverflow(format!("10^{decimals}")))?;
        Ok(Self { decimals, factor })
    }

    #[must_use]
    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    /// Base units per whole unit.
    #[must_use]
    pub fn factor(&self) -> u128 {
        self.factor
    }

    /// Whole units scaled to base units.
    ///
    /// # Errors
    /// Returns `ArithmeticOverflow` if the product exceeds `u128`.
    pub fn to_base_units(&self, units: u64) -> Result<u128> {
        u128::from(units)
            .checked_mul(self.factor)
            .ok_or_else(|| SaleError::ArithmeticOverflow(format!("{units} units * {}", self.factor)))
    }

    /// Whole sellable units in a base-unit balance. Sub-unit dust is dropped
    /// and counts above `u64::MAX` saturate.
    #[must_use]
    pub fn whole_units(&self, base_units: u128) -> u64 {
        u64::try_from(base_units / self.factor).unwrap_or(u64::MAX)
    }
}
