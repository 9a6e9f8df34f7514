//! Identifiers used throughout OpenEscrow.
//!
//! Parties are ed25519 public keys. Ledger accounts and escrow records use
//! UUIDv7 for time-ordered sorting. Custody identities (`AuthorityId`,
//! `VaultId`) are 32-byte SHA-256 derivations and have no private key.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// PartyId
// ---------------------------------------------------------------------------

/// A counterparty identity: the raw ed25519 verifying key (32 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct PartyId(pub [u8; 32]);

impl PartyId {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "party:{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// MintId
// ---------------------------------------------------------------------------

/// Identity of one asset kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct MintId(pub [u8; 32]);

impl MintId {
    /// Deterministic mint identity from a human label (e.g. `"USDC"`).
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"openescrow:mint:v1:");
        hasher.update(label.as_bytes());
        Self(hasher.finalize().into())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for MintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mint:{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// TokenAccountId
// ---------------------------------------------------------------------------

/// A token account held by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct TokenAccountId(pub Uuid);

impl TokenAccountId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Deterministic account id for derived (program-owned) accounts.
    ///
    /// The same seed always yields the same id.
    #[must_use]
    pub fn deterministic(seed: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"openescrow:token_account:v1:");
        hasher.update(seed);
        let hash = hasher.finalize();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&hash[..16]);
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for TokenAccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TokenAccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "acct:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// AuthorityId
// ---------------------------------------------------------------------------

/// Derived custody authority. Only ever produced by a derivation function;
/// there is no signing key behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AuthorityId(pub [u8; 32]);

impl fmt::Display for AuthorityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "authority:{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// VaultId
// ---------------------------------------------------------------------------

/// Derived address of a custody vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct VaultId(pub [u8; 32]);

impl VaultId {
    /// The ledger account backing this vault.
    #[must_use]
    pub fn token_account(&self) -> TokenAccountId {
        TokenAccountId::deterministic(&self.0)
    }
}

impl fmt::Display for VaultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vault:{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// ProgramId
// ---------------------------------------------------------------------------

/// Identity of a deployed settlement program. Every custody derivation is
/// namespaced under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ProgramId(pub [u8; 32]);

impl ProgramId {
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"openescrow:program:v1:");
        hasher.update(label.as_bytes());
        Self(hasher.finalize().into())
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "program:{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// RecordId
// ---------------------------------------------------------------------------

/// Identity of one escrow record instance. A scope can be reused after its
/// record closes; each use gets a fresh `RecordId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct RecordId(pub Uuid);

impl RecordId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "escrow:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ScopeKey
// ---------------------------------------------------------------------------

/// One independent trade slot: (initializer, deposit mint).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ScopeKey {
    pub initializer: PartyId,
    pub deposit_mint: MintId,
}

impl ScopeKey {
    #[must_use]
    pub fn new(initializer: PartyId, deposit_mint: MintId) -> Self {
        Self {
            initializer,
            deposit_mint,
        }
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.initializer, self.deposit_mint)
    }
}

// ---------------------------------------------------------------------------
// Owner
// ---------------------------------------------------------------------------

/// Who may debit a ledger account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Owner {
    /// A counterparty holding a signing key.
    Party(PartyId),
    /// A derived custody authority.
    Authority(AuthorityId),
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Party(p) => write!(f, "{p}"),
            Self::Authority(a) => write!(f, "{a}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
