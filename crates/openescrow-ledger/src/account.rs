//! Ledger token accounts.

use openescrow_types::{MintId, Owner, TokenAccountId};
use serde::{Deserialize, Serialize};

/// A balance of one mint, debitable only by its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAccount {
    pub id: TokenAccountId,
    pub mint: MintId,
    pub owner: Owner,
    pub amount: u64,
}

impl TokenAccount {
    /// Create an empty account.
    #[must_use]
    pub fn new(id: TokenAccountId, mint: MintId, owner: Owner) -> Self {
        Self {
            id,
            mint,
            owner,
            amount: 0,
        }
    }

    #[must_use]
    pub fn is_owned_by(&self, owner: Owner) -> bool {
        self.owner == owner
    }
}
