//! Supply conservation invariant checker.
//!
//! Invariant enforced at every observation point:
//! ```text
//! ∀ mint: Σ(account balances, vaults included) == Σ(minted)
//! ```
//!
//! Escrow only moves balances between accounts. If supply ever drifts,
//! a transfer created or destroyed funds.

use std::collections::HashMap;

use openescrow_types::{MintId, OpenescrowError, Result};

/// Tracks per-mint issued supply.
#[derive(Debug, Default)]
pub struct SupplyConservation {
    /// Total minted per mint since genesis.
    minted: HashMap<MintId, u64>,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self {
            minted: HashMap::new(),
        }
    }

    /// Record newly issued supply.
    ///
    /// # Errors
    /// Returns `Overflow` if total supply for the mint would exceed `u64`.
    pub fn record_mint(&mut self, mint: MintId, amount: u64) -> Result<()> {
        let total = self.minted.entry(mint).or_insert(0);
        *total = total.checked_add(amount).ok_or(OpenescrowError::Overflow)?;
        Ok(())
    }

    /// Expected total supply for a mint.
    #[must_use]
    pub fn expected_supply(&self, mint: &MintId) -> u64 {
        self.minted.get(mint).copied().unwrap_or(0)
    }

    /// Compare the observed sum of balances against issued supply.
    ///
    /// # Errors
    /// Returns [`OpenescrowError::SupplyInvariantViolation`] if they differ.
    pub fn verify(&self, mint: &MintId, actual_supply: u128) -> Result<()> {
        let expected = self.expected_supply(mint);
        if actual_supply != u128::from(expected) {
            return Err(OpenescrowError::SupplyInvariantViolation {
                reason: format!("{mint}: actual supply {actual_supply} != minted {expected}"),
            });
        }
        Ok(())
    }

    /// Every mint that has ever been issued.
    #[must_use]
    pub fn tracked_mints(&self) -> Vec<MintId> {
        let mut mints: Vec<MintId> = self.minted.keys().copied().collect();
        mints.sort();
        mints
    }
}
