//! # Escrow record: the terms of one outstanding trade offer
//!
//! ## State Machine
//!
//! ```text
//!   ┌────────┐  partial exchange   ┌────────┐
//!   │ ACTIVE ├────────────────────▶│ ACTIVE │
//!   └───┬────┘                     └───┬────┘
//!       │ full exchange / cancel       │
//!       ▼                              ▼
//!   ┌────────┐
//!   │ CLOSED │  (terminal)
//!   └────────┘
//! ```
//!
//! The original amounts are never rewritten after creation: they fix the
//! exchange rate for every partial fill. Remaining custody is the vault's
//! live ledger balance.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{MintId, OpenescrowError, PartyId, RecordId, ScopeKey, TokenAccountId, VaultId};

/// Lifecycle state of an escrow record. Transitions are monotonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordState {
    /// Deposit locked; exchange and cancel are allowed.
    Active,
    /// Vault emptied by a full exchange or a cancel. **Terminal.**
    Closed,
}

impl RecordState {
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!((self, target), (Self::Active, Self::Active | Self::Closed))
    }
}

impl std::fmt::Display for RecordState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}

/// One active trade offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowRecord {
    /// Identity of this record instance.
    pub id: RecordId,
    /// The party who created the offer.
    pub initializer: PartyId,
    /// Initializer account the deposit came from; refunds go back here.
    pub release_account: TokenAccountId,
    /// Initializer account that receives the counter-asset.
    pub receive_account: TokenAccountId,
    /// Asset locked in the vault.
    pub deposit_mint: MintId,
    /// Asset the initializer wants in return.
    pub counter_mint: MintId,
    /// Quantity of `deposit_mint` locked at creation.
    pub deposit_amount_original: u64,
    /// Quantity of `counter_mint` expected for the full offer.
    pub counter_amount_expected: u64,
    /// Vault holding the locked deposit.
    pub vault: VaultId,
    /// Current lifecycle state.
    pub state: RecordState,
    /// When the offer was created.
    pub created_at: DateTime<Utc>,
}

impl EscrowRecord {
    /// The trade slot this record occupies.
    #[must_use]
    pub fn scope(&self) -> ScopeKey {
        ScopeKey::new(self.initializer, self.deposit_mint)
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == RecordState::Active
    }

    /// Deposit units per counter unit, fixed at creation.
    ///
    /// `None` only if `counter_amount_expected` is zero, which creation
    /// never allows.
    #[must_use]
    pub fn rate(&self) -> Option<Decimal> {
        Decimal::from(self.deposit_amount_original)
            .checked_div(Decimal::from(self.counter_amount_expected))
    }

    /// Transition to CLOSED.
    ///
    /// # Errors
    /// Returns `RecordClosed` if the record is already closed.
    pub fn mark_closed(&mut self) -> crate::Result<()> {
        if !self.state.can_transition_to(RecordState::Closed) {
            return Err(OpenescrowError::RecordClosed(self.id));
        }
        self.state = RecordState::Closed;
        Ok(())
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl EscrowRecord {
    /// Record with fresh ids and the given amounts, for unit tests.
    pub fn dummy(deposit_amount_original: u64, counter_amount_expected: u64) -> Self {
        Self {
            id: RecordId::new(),
            initializer: PartyId(rand::random()),
            release_account: TokenAccountId::new(),
            receive_account: TokenAccountId::new(),
            deposit_mint: MintId::from_label("A"),
            counter_mint: MintId::from_label("B"),
            deposit_amount_original,
            counter_amount_expected,
            vault: VaultId(rand::random()),
            state: RecordState::Active,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_transitions() {
        assert!(RecordState::Active.can_transition_to(RecordState::Closed));
        assert!(RecordState::Active.can_transition_to(RecordState::Active));
        assert!(!RecordState::Closed.can_transition_to(RecordState::Active));
        assert!(!RecordState::Closed.can_transition_to(RecordState::Closed));
    }

    #[test]
    fn double_close_blocked() {
        let mut record = EscrowRecord::dummy(500, 1000);
        record.mark_closed().unwrap();
        assert!(!record.is_active());
        let err = record.mark_closed().unwrap_err();
        assert!(matches!(err, OpenescrowError::RecordClosed(id) if id == record.id));
    }

    #[test]
    fn rate_is_exact() {
        let record = EscrowRecord::dummy(500, 1000);
        assert_eq!(record.rate(), Some(Decimal::new(5, 1)));
        let record = EscrowRecord::dummy(1, 3);
        assert!(record.rate().is_some());
    }

    #[test]
    fn scope_uses_initializer_and_deposit_mint() {
        let record = EscrowRecord::dummy(10, 20);
        let scope = record.scope();
        assert_eq!(scope.initializer, record.initializer);
        assert_eq!(scope.deposit_mint, record.deposit_mint);
    }

    #[test]
    fn serde_roundtrip() {
        let record = EscrowRecord::dummy(500, 1000);
        let json = serde_json::to_string(&record).unwrap();
        let back: EscrowRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}
