//! Configuration types for a token sale deployment.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{constants, Address, Result, SaleError};

/// Immutable pricing parameters of a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleConfig {
    /// Native-currency price of one whole token unit.
    pub unit_price: Decimal,
    /// Maximum cumulative whole units a single buyer may acquire.
    pub max_per_buyer: u64,
    /// Token decimals: one whole unit is `10^decimals` base units.
    pub decimals: u32,
}

impl SaleConfig {
    #[must_use]
    pub fn new(unit_price: Decimal, max_per_buyer: u64, decimals: u32) -> Self {
        Self {
            unit_price,
            max_per_buyer,
            decimals,
        }
    }

    /// # Errors
    /// Returns `Configuration` for a non-positive price, a zero cap, or
    /// decimals beyond [`constants::MAX_DECIMALS`].
    pub fn validate(&self) -> Result<()> {
        if self.unit_price <= Decimal::ZERO {
            return Err(SaleError::Configuration(format!(
                "unit_price must be positive, got {}",
                self.unit_price
            )));
        }
        if self.max_per_buyer == 0 {
            return Err(SaleError::Configuration(
                "max_per_buyer must be at least 1".to_string(),
            ));
        }
        if self.decimals > constants::MAX_DECIMALS {
            return Err(SaleError::Configuration(format!(
                "decimals must be <= {}, got {}",
                constants::MAX_DECIMALS,
                self.decimals
            )));
        }
        Ok(())
    }
}

impl Default for SaleConfig {
    fn default() -> Self {
        Self {
            unit_price: constants::DEFAULT_UNIT_PRICE,
            max_per_buyer: constants::DEFAULT_MAX_PER_BUYER,
            decimals: constants::DEFAULT_DECIMALS,
        }
    }
}

/// Everything a sale needs at construction: roles, ledger addresses, pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// The sale's own account on the token ledger and payment transport.
    pub sale: Address,
    /// The deployer.
    pub owner: Address,
    /// Receives the retained payment of every purchase.
    pub treasury: Address,
    /// Address of the token ledger holding the inventory.
    pub token: Address,
    /// Pricing parameters.
    #[serde(default)]
    pub pricing: SaleConfig,
}

impl DeploymentConfig {
    /// Parse and validate a JSON deployment document.
    ///
    /// # Errors
    /// `Serialization` for malformed JSON, `Configuration` for invalid values.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    /// Returns `Configuration` if any role is the zero address, if the
    /// treasury is the sale itself, or if the pricing is invalid.
    pub fn validate(&self) -> Result<()> {
        for (role, addr) in [
            ("sale", self.sale),
            ("owner", self.owner),
            ("treasury", self.treasury),
            ("token", self.token),
        ] {
            if addr.is_zero() {
                return Err(SaleError::Configuration(format!(
                    "{role} address must not be zero"
                )));
            }
        }
        if self.treasury == self.sale {
            return Err(SaleError::Configuration(
                "treasury must differ from the sale address".to_string(),
            ));
        }
        self.pricing.validate()
    }
}
