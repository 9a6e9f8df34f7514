//! Escrow registry: owns the lifecycle of escrow records.
//!
//! Records are keyed by [`ScopeKey`] (initializer, deposit mint), so any
//! number of trades coexist and one slot never blocks another. A scope
//! holds at most one unclosed record; once that record closes the scope is
//! free again and a new record (with a new [`RecordId`]) may take it.
//!
//! Closed ids are remembered, up to a fixed capacity, so that a late
//! operation on a finished trade reports `RecordClosed` rather than an
//! unknown record. Past capacity the oldest ids are forgotten.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::Utc;
use openescrow_types::{
    EscrowRecord, InitializeArgs, OpenescrowError, RecordId, RecordState, Result, ScopeKey,
    VaultId,
};

/// Active escrow records, indexed by scope and by record id.
pub struct EscrowRegistry {
    /// Active records by trade slot.
    by_scope: HashMap<ScopeKey, EscrowRecord>,
    /// Record id → scope, for lookups by id.
    scope_of: HashMap<RecordId, ScopeKey>,
    /// Recently closed record ids.
    closed: HashSet<RecordId>,
    /// Closing order, oldest first.
    closed_order: VecDeque<RecordId>,
    closed_capacity: usize,
}

impl EscrowRegistry {
    /// Create an empty registry remembering up to `closed_cache_size`
    /// closed record ids. A zero size is treated as one.
    #[must_use]
    pub fn new(closed_cache_size: usize) -> Self {
        let closed_capacity = closed_cache_size.max(1);
        Self {
            by_scope: HashMap::new(),
            scope_of: HashMap::new(),
            closed: HashSet::new(),
            closed_order: VecDeque::with_capacity(closed_capacity.min(1024)),
            closed_capacity,
        }
    }

    /// Create an ACTIVE record for the offer described by `args`.
    ///
    /// # Errors
    /// - `InvalidAmount` if either amount is zero
    /// - `AlreadyExists` if an unclosed record occupies the scope
    pub fn create(&mut self, args: &InitializeArgs, vault: VaultId) -> Result<EscrowRecord> {
        if args.deposit_amount == 0 {
            return Err(OpenescrowError::InvalidAmount {
                reason: "deposit amount must be positive".to_string(),
            });
        }
        if args.counter_amount == 0 {
            return Err(OpenescrowError::InvalidAmount {
                reason: "counter amount must be positive".to_string(),
            });
        }

        let scope = ScopeKey::new(args.initializer, args.deposit_mint);
        if self.by_scope.contains_key(&scope) {
            return Err(OpenescrowError::AlreadyExists(scope));
        }

        let record = EscrowRecord {
            id: RecordId::new(),
            initializer: args.initializer,
            release_account: args.release_account,
            receive_account: args.receive_account,
            deposit_mint: args.deposit_mint,
            counter_mint: args.counter_mint,
            deposit_amount_original: args.deposit_amount,
            counter_amount_expected: args.counter_amount,
            vault,
            state: RecordState::Active,
            created_at: Utc::now(),
        };
        self.insert(record.clone());
        Ok(record)
    }

    /// Close a record whose vault has been emptied.
    ///
    /// # Errors
    /// - `RecordClosed` / `InvalidAccount` if the record isn't active
    /// - `AccountNotEmpty` if `vault_balance` is not zero
    pub fn close(&mut self, record_id: RecordId, vault_balance: u64) -> Result<EscrowRecord> {
        let record = self.resolve(&record_id)?;
        let scope = record.scope();
        if vault_balance != 0 {
            return Err(OpenescrowError::AccountNotEmpty {
                account: record.vault.token_account(),
                balance: vault_balance,
            });
        }

        let mut record = self
            .by_scope
            .remove(&scope)
            .ok_or_else(|| OpenescrowError::Internal(format!("scope index lost {record_id}")))?;
        self.scope_of.remove(&record_id);
        record.mark_closed()?;
        self.remember_closed(record_id);
        Ok(record)
    }

    fn remember_closed(&mut self, record_id: RecordId) {
        if !self.closed.insert(record_id) {
            return;
        }
        self.closed_order.push_back(record_id);
        while self.closed_order.len() > self.closed_capacity {
            if let Some(forgotten) = self.closed_order.pop_front() {
                self.closed.remove(&forgotten);
            }
        }
    }

    /// Undo a `create` whose ledger side failed to commit.
    ///
    /// The record never became visible to any other operation, so it is
    /// dropped without entering the closed log.
    pub fn discard(&mut self, record_id: RecordId) {
        if let Some(scope) = self.scope_of.remove(&record_id) {
            self.by_scope.remove(&scope);
        }
    }

    /// Re-insert an active record (snapshot restore).
    pub(crate) fn insert(&mut self, record: EscrowRecord) {
        let scope = record.scope();
        self.scope_of.insert(record.id, scope);
        self.by_scope.insert(scope, record);
    }

    /// Look up an active record by id.
    #[must_use]
    pub fn get(&self, record_id: &RecordId) -> Option<&EscrowRecord> {
        self.scope_of
            .get(record_id)
            .and_then(|scope| self.by_scope.get(scope))
    }

    /// Look up an active record, explaining why it is missing.
    ///
    /// # Errors
    /// - `RecordClosed` if the record has closed
    /// - `InvalidAccount` if no such record was ever seen
    pub fn resolve(&self, record_id: &RecordId) -> Result<&EscrowRecord> {
        if let Some(record) = self.get(record_id) {
            return Ok(record);
        }
        if self.closed.contains(record_id) {
            return Err(OpenescrowError::RecordClosed(*record_id));
        }
        Err(OpenescrowError::InvalidAccount {
            reason: format!("unknown escrow record {record_id}"),
        })
    }

    /// The active record occupying `scope`, if any.
    #[must_use]
    pub fn by_scope(&self, scope: &ScopeKey) -> Option<&EscrowRecord> {
        self.by_scope.get(scope)
    }

    #[must_use]
    pub fn is_occupied(&self, scope: &ScopeKey) -> bool {
        self.by_scope.contains_key(scope)
    }

    #[must_use]
    pub fn is_closed(&self, record_id: &RecordId) -> bool {
        self.closed.contains(record_id)
    }

    /// All active records, oldest first.
    #[must_use]
    pub fn active(&self) -> Vec<&EscrowRecord> {
        let mut records: Vec<&EscrowRecord> = self.by_scope.values().collect();
        records.sort_by_key(|record| record.id);
        records
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.by_scope.len()
    }
}
