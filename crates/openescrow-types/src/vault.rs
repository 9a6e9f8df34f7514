//! Custody vault descriptor.
//!
//! A vault is a ledger token account owned by a derived [`AuthorityId`].
//! Its balance lives in the ledger, which is the single source of truth;
//! this descriptor only carries the references needed to check and move it.

use serde::{Deserialize, Serialize};

use crate::{AuthorityId, MintId, ScopeKey, TokenAccountId, VaultId};

/// One custody holder per trade scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    /// Derived vault address.
    pub id: VaultId,
    /// Scope the vault serves.
    pub scope: ScopeKey,
    /// Asset held.
    pub mint: MintId,
    /// Backing ledger account.
    pub account: TokenAccountId,
    /// The only identity allowed to debit `account`.
    pub authority: AuthorityId,
}
