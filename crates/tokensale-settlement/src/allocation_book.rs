//! Per-buyer cumulative allocation.
//!
//! Invariant: `allocated(buyer) <= cap` for every buyer at all times. The
//! book only grows; entries are never removed.

use std::collections::HashMap;

use tokensale_types::{Address, Result, SaleError};

/// Whole units bought so far by each buyer.
#[derive(Debug, Clone)]
pub struct AllocationBook {
    allocations: HashMap<Address, u64>,
    /// Per-buyer ceiling in whole units.
    cap: u64,
}

impl AllocationBook {
    #[must_use]
    pub fn new(cap: u64) -> Self {
        Self {
            allocations: HashMap::new(),
            cap,
        }
    }

    #[must_use]
    pub fn cap(&self) -> u64 {
        self.cap
    }

    /// Units bought by `buyer` so far (0 for unknown buyers).
    #[must_use]
    pub fn allocated(&self, buyer: &Address) -> u64 {
        self.allocations.get(buyer).copied().unwrap_or(0)
    }

    /// The buyer's total if `units` were added. Nothing is written.
    ///
    /// # Errors
    /// Returns `SettlementFailed` if the new total would exceed the cap.
    pub fn stage(&self, buyer: &Address, units: u64) -> Result<u64> {
        let current = self.allocated(buyer);
        let total = current
            .checked_add(units)
            .filter(|total| *total <= self.cap)
            .ok_or_else(|| SaleError::SettlementFailed {
                reason: format!(
                    "buyer {buyer} would hold {current} + {units} units, cap is {}",
                    self.cap
                ),
            })?;
        Ok(total)
    }

    /// Write a total previously returned by [`Self::stage`].
    pub fn commit(&mut self, buyer: Address, total: u64) {
        debug_assert!(total <= self.cap);
        debug_assert!(total >= self.allocated(&buyer));
        self.allocations.insert(buyer, total);
    }

    /// Number of distinct buyers.
    #[must_use]
    pub fn buyers(&self) -> usize {
        self.allocations.len()
    }

    /// Sum of all allocations.
    #[must_use]
    pub fn total_allocated(&self) -> u128 {
        self.allocations.values().map(|u| u128::from(*u)).sum()
    }
}
