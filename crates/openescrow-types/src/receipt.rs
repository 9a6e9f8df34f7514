//! Settlement results and the audit event log.
//!
//! Every committed Exchange or Cancel yields a [`SettlementResult`] carrying
//! a SHA-256 digest over its settlement fields, so two observers can
//! compare outcomes without comparing timestamps.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{EscrowRecord, RecordId, ScopeKey, TokenAccountId, constants};

/// Which operation settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettlementKind {
    Exchange,
    Cancel,
}

impl std::fmt::Display for SettlementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exchange => write!(f, "EXCHANGE"),
            Self::Cancel => write!(f, "CANCEL"),
        }
    }
}

/// Outcome of one committed Exchange or Cancel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementResult {
    pub record_id: RecordId,
    pub kind: SettlementKind,
    /// Counter-asset units paid by the taker (zero for cancel).
    pub offered: u64,
    /// Deposit units released from the vault.
    pub released: u64,
    /// Account credited with `released`.
    pub recipient: TokenAccountId,
    /// Vault balance after settlement.
    pub remaining: u64,
    /// Whether the record closed in this settlement.
    pub closed: bool,
    /// SHA-256 over the fields above.
    pub digest: [u8; 32],
    pub settled_at: DateTime<Utc>,
}

impl SettlementResult {
    #[must_use]
    pub fn new(
        record_id: RecordId,
        kind: SettlementKind,
        offered: u64,
        released: u64,
        recipient: TokenAccountId,
        remaining: u64,
    ) -> Self {
        let closed = remaining == 0;
        let digest = Self::compute_digest(record_id, kind, offered, released, recipient, remaining);
        Self {
            record_id,
            kind,
            offered,
            released,
            recipient,
            remaining,
            closed,
            digest,
            settled_at: Utc::now(),
        }
    }

    fn compute_digest(
        record_id: RecordId,
        kind: SettlementKind,
        offered: u64,
        released: u64,
        recipient: TokenAccountId,
        remaining: u64,
    ) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(constants::SETTLEMENT_DOMAIN);
        hasher.update(record_id.0.as_bytes());
        hasher.update(match kind {
            SettlementKind::Exchange => [0u8],
            SettlementKind::Cancel => [1u8],
        });
        hasher.update(offered.to_le_bytes());
        hasher.update(released.to_le_bytes());
        hasher.update(recipient.0.as_bytes());
        hasher.update(remaining.to_le_bytes());
        hasher.finalize().into()
    }

    /// Recompute the digest and compare.
    #[must_use]
    pub fn verify_digest(&self) -> bool {
        Self::compute_digest(
            self.record_id,
            self.kind,
            self.offered,
            self.released,
            self.recipient,
            self.remaining,
        ) == self.digest
    }

    /// Released deposit units per counter unit paid. `None` for cancels.
    #[must_use]
    pub fn effective_rate(&self) -> Option<Decimal> {
        Decimal::from(self.released).checked_div(Decimal::from(self.offered))
    }
}

/// Append-only audit trail of committed operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EscrowEvent {
    Initialized {
        record: EscrowRecord,
    },
    Exchanged {
        scope: ScopeKey,
        result: SettlementResult,
    },
    Cancelled {
        scope: ScopeKey,
        result: SettlementResult,
    },
}

impl EscrowEvent {
    #[must_use]
    pub fn record_id(&self) -> RecordId {
        match self {
            Self::Initialized { record } => record.id,
            Self::Exchanged { result, .. } | Self::Cancelled { result, .. } => result.record_id,
        }
    }
}
