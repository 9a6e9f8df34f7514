//! Escrow program: the Initialize / Exchange / Cancel entry points.
//!
//! Each operation runs the same pipeline:
//!
//! ```text
//! AuthorizationGuard → stage on LedgerBatch → TokenLedger::commit → registry/custody bookkeeping
//! ```
//!
//! Nothing outside the staged batch is touched until the ledger commit
//! succeeds, with one exception: Initialize reserves its scope in the
//! registry before committing and discards the reservation if the commit
//! fails. A rejected operation therefore leaves every record, vault, and
//! balance as it was.
//!
//! Signed envelopes additionally pass a replay check in [`EscrowProgram::execute`]:
//! each signer's nonces must strictly increase. A nonce is spent once its
//! signature verifies, whether or not the operation then succeeds.

use std::collections::HashMap;

use openescrow_ledger::{LedgerBatch, TokenLedger};
use openescrow_types::{
    AuthorityId, CancelArgs, EscrowConfig, EscrowEvent, EscrowRecord, ExchangeArgs,
    InitializeArgs, Instruction, OpenescrowError, PartyId, RecordId, Result, ScopeKey,
    SettlementKind, SettlementResult, SignedInstruction, Signer, Vault, VaultId,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::custody::VaultCustody;
use crate::guard::AuthorizationGuard;
use crate::registry::EscrowRegistry;
use crate::swap::SwapEngine;

/// What a dispatched instruction produced.
#[derive(Debug, Clone)]
pub enum Outcome {
    Initialized(EscrowRecord),
    Settled(SettlementResult),
}

/// Serialisable state of a program: its active records, open vaults, and
/// the last nonce accepted from each signer.
///
/// Balances are not part of the snapshot; they live in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramSnapshot {
    pub records: Vec<EscrowRecord>,
    pub vaults: Vec<Vault>,
    pub nonces: Vec<(PartyId, u64)>,
}

/// The settlement program.
pub struct EscrowProgram {
    config: EscrowConfig,
    custody: VaultCustody,
    registry: EscrowRegistry,
    /// Highest nonce accepted per signer.
    nonces: HashMap<PartyId, u64>,
    /// Committed operations not yet drained by [`Self::take_events`].
    events: Vec<EscrowEvent>,
}

impl EscrowProgram {
    /// Create a program with no records.
    ///
    /// # Errors
    /// Returns `Configuration` if `config` fails validation.
    pub fn new(config: EscrowConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            custody: VaultCustody::new(&config),
            registry: EscrowRegistry::new(config.closed_record_cache_size),
            nonces: HashMap::new(),
            events: Vec::new(),
            config,
        })
    }

    /// Lock `deposit_amount` of the deposit mint in a fresh vault and open
    /// an offer for `counter_amount` of the counter mint.
    ///
    /// # Errors
    /// - `Unauthorized` / `InvalidAccount` / `AlreadyExists` from the guard
    /// - `InvalidAmount` for a zero amount
    /// - `InsufficientFunds` if the release account can't cover the deposit
    pub fn initialize(
        &mut self,
        ledger: &mut TokenLedger,
        signer: &Signer,
        args: InitializeArgs,
    ) -> Result<EscrowRecord> {
        let scope = ScopeKey::new(args.initializer, args.deposit_mint);
        self.try_initialize(ledger, signer, &args)
            .inspect_err(|err| warn!(scope = %scope, error = %err, "Initialize rejected"))
    }

    fn try_initialize(
        &mut self,
        ledger: &mut TokenLedger,
        signer: &Signer,
        args: &InitializeArgs,
    ) -> Result<EscrowRecord> {
        AuthorizationGuard::check_initialize(signer, args, ledger, &self.registry)?;

        let scope = ScopeKey::new(args.initializer, args.deposit_mint);
        let vault = self.custody.describe(&scope);
        let record = self.registry.create(args, vault.id)?;

        let mut batch = LedgerBatch::new();
        self.custody.open(&vault, &mut batch);
        let staged = self.custody.deposit(
            &vault,
            args.deposit_amount,
            args.release_account,
            args.initializer,
            &mut batch,
        );
        if let Err(err) = staged.and_then(|()| ledger.commit(batch)) {
            self.registry.discard(record.id);
            return Err(err);
        }

        self.custody.register(vault);
        info!(
            record = %record.id,
            scope = %scope,
            deposit = record.deposit_amount_original,
            counter = record.counter_amount_expected,
            "Escrow initialized"
        );
        self.events.push(EscrowEvent::Initialized {
            record: record.clone(),
        });
        Ok(record)
    }

    /// Pay `offered_amount` of the counter mint and receive the
    /// proportional share of the vault at the original rate.
    ///
    /// # Errors
    /// - `RecordClosed` / `InvalidAccount` / `Unauthorized` from the guard
    /// - `InvalidAmount`, `Overflow`, `InsufficientFunds` from pricing
    /// - `InsufficientFunds` if the taker can't cover the offer
    pub fn exchange(
        &mut self,
        ledger: &mut TokenLedger,
        signer: &Signer,
        args: ExchangeArgs,
    ) -> Result<SettlementResult> {
        let record_id = args.record;
        self.try_exchange(ledger, signer, &args)
            .inspect_err(|err| warn!(record = %record_id, error = %err, "Exchange rejected"))
    }

    fn try_exchange(
        &mut self,
        ledger: &mut TokenLedger,
        signer: &Signer,
        args: &ExchangeArgs,
    ) -> Result<SettlementResult> {
        let record = AuthorizationGuard::check_exchange(signer, args, ledger, &self.registry)?;
        let vault = self.open_vault(&record.vault)?;

        let result = SwapEngine::exchange(ledger, &self.custody, &record, &vault, args)?;
        if result.closed {
            self.registry.close(record.id, result.remaining)?;
            self.custody.retire(&vault.id);
        }

        info!(
            record = %record.id,
            scope = %record.scope(),
            offered = result.offered,
            released = result.released,
            remaining = result.remaining,
            "Exchange settled"
        );
        self.events.push(EscrowEvent::Exchanged {
            scope: record.scope(),
            result: result.clone(),
        });
        Ok(result)
    }

    /// Refund the whole remaining vault balance to the initializer and
    /// close the record.
    ///
    /// # Errors
    /// - `RecordClosed` / `InvalidAccount` / `Unauthorized` from the guard
    pub fn cancel(
        &mut self,
        ledger: &mut TokenLedger,
        signer: &Signer,
        args: CancelArgs,
    ) -> Result<SettlementResult> {
        let record_id = args.record;
        self.try_cancel(ledger, signer, &args)
            .inspect_err(|err| warn!(record = %record_id, error = %err, "Cancel rejected"))
    }

    fn try_cancel(
        &mut self,
        ledger: &mut TokenLedger,
        signer: &Signer,
        args: &CancelArgs,
    ) -> Result<SettlementResult> {
        let record = AuthorizationGuard::check_cancel(signer, args, &self.registry)?;
        let vault = self.open_vault(&record.vault)?;
        let balance = ledger.balance(&vault.account);
        let authority = self.custody.derive_authority(&record.scope());

        let mut batch = LedgerBatch::new();
        if balance > 0 {
            self.custody.release(
                &vault,
                authority,
                balance,
                args.release_account,
                balance,
                &mut batch,
            )?;
        }
        self.custody.close(&vault, authority, &mut batch)?;
        ledger.commit(batch)?;

        self.registry.close(record.id, 0)?;
        self.custody.retire(&vault.id);

        let result = SettlementResult::new(
            record.id,
            SettlementKind::Cancel,
            0,
            balance,
            args.release_account,
            0,
        );
        info!(
            record = %record.id,
            scope = %record.scope(),
            refunded = balance,
            "Escrow cancelled"
        );
        self.events.push(EscrowEvent::Cancelled {
            scope: record.scope(),
            result: result.clone(),
        });
        Ok(result)
    }

    /// Verify a signed instruction, spend its nonce, and dispatch it.
    ///
    /// # Errors
    /// - `SignatureInvalid` for a bad envelope
    /// - `NonceReplayed` if the nonce is not above the signer's last one
    /// - otherwise whatever the dispatched operation returns
    pub fn execute(
        &mut self,
        ledger: &mut TokenLedger,
        signed: SignedInstruction,
    ) -> Result<Outcome> {
        let nonce = signed.nonce;
        let (signer, instruction) = signed
            .verify()
            .and_then(|verified| {
                self.spend_nonce(verified.0.party(), nonce)?;
                Ok(verified)
            })
            .inspect_err(|err| warn!(error = %err, "Instruction envelope rejected"))?;
        tracing::debug!(
            instruction = instruction.name(),
            signer = %signer.party(),
            nonce,
            "Dispatching instruction"
        );
        match instruction {
            Instruction::Initialize(args) => self
                .initialize(ledger, &signer, args)
                .map(Outcome::Initialized),
            Instruction::Exchange(args) => {
                self.exchange(ledger, &signer, args).map(Outcome::Settled)
            }
            Instruction::Cancel(args) => self.cancel(ledger, &signer, args).map(Outcome::Settled),
        }
    }

    fn spend_nonce(&mut self, signer: PartyId, nonce: u64) -> Result<()> {
        if let Some(&last) = self.nonces.get(&signer) {
            if nonce <= last {
                return Err(OpenescrowError::NonceReplayed {
                    signer,
                    nonce,
                    last,
                });
            }
        }
        self.nonces.insert(signer, nonce);
        Ok(())
    }

    fn open_vault(&self, vault_id: &VaultId) -> Result<Vault> {
        self.custody.vault(vault_id).cloned().ok_or_else(|| {
            OpenescrowError::Internal(format!("active record without vault {vault_id}"))
        })
    }

    // ── Queries ─────────────────────────────────────────────────────

    #[must_use]
    pub fn config(&self) -> &EscrowConfig {
        &self.config
    }

    #[must_use]
    pub fn record(&self, record_id: &RecordId) -> Option<&EscrowRecord> {
        self.registry.get(record_id)
    }

    #[must_use]
    pub fn record_for_scope(&self, scope: &ScopeKey) -> Option<&EscrowRecord> {
        self.registry.by_scope(scope)
    }

    #[must_use]
    pub fn is_closed(&self, record_id: &RecordId) -> bool {
        self.registry.is_closed(record_id)
    }

    /// Active records, oldest first.
    #[must_use]
    pub fn active_records(&self) -> Vec<&EscrowRecord> {
        self.registry.active()
    }

    #[must_use]
    pub fn vault(&self, vault_id: &VaultId) -> Option<&Vault> {
        self.custody.vault(vault_id)
    }

    /// Live balance of an open vault.
    ///
    /// # Errors
    /// Returns `InvalidAccount` if the vault isn't open.
    pub fn vault_balance(&self, ledger: &TokenLedger, vault_id: &VaultId) -> Result<u64> {
        self.custody.balance(ledger, vault_id)
    }

    #[must_use]
    pub fn derive_authority(&self, scope: &ScopeKey) -> AuthorityId {
        self.custody.derive_authority(scope)
    }

    /// Highest nonce accepted from `signer`, if any.
    #[must_use]
    pub fn last_nonce(&self, signer: &PartyId) -> Option<u64> {
        self.nonces.get(signer).copied()
    }

    /// Committed operations since the last drain, oldest first.
    #[must_use]
    pub fn events(&self) -> &[EscrowEvent] {
        &self.events
    }

    /// Hand the buffered audit trail to the caller and start a fresh one.
    ///
    /// The program never discards events on its own; a long-running host
    /// drains them periodically into its own audit store.
    pub fn take_events(&mut self) -> Vec<EscrowEvent> {
        std::mem::take(&mut self.events)
    }

    // ── Persistence ─────────────────────────────────────────────────

    #[must_use]
    pub fn snapshot(&self) -> ProgramSnapshot {
        ProgramSnapshot {
            records: self.registry.active().into_iter().cloned().collect(),
            vaults: self.custody.vaults().into_iter().cloned().collect(),
            nonces: {
                let mut nonces: Vec<(PartyId, u64)> =
                    self.nonces.iter().map(|(party, nonce)| (*party, *nonce)).collect();
                nonces.sort_unstable();
                nonces
            },
        }
    }

    /// Rebuild a program from a snapshot taken under the same `config`.
    ///
    /// The event log and closed-record memory start empty; signer nonces
    /// carry over.
    ///
    /// # Errors
    /// - `Configuration` if `config` is invalid
    /// - `InvalidAccount` if a record or vault doesn't derive from `config`,
    ///   a record's vault is missing, or a vault belongs to no record
    pub fn restore(config: EscrowConfig, snapshot: ProgramSnapshot) -> Result<Self> {
        let mut program = Self::new(config)?;

        for vault in snapshot.vaults {
            if program.custody.describe(&vault.scope) != vault {
                return Err(OpenescrowError::InvalidAccount {
                    reason: format!("vault {} does not derive from this config", vault.id),
                });
            }
            if !snapshot.records.iter().any(|record| record.vault == vault.id) {
                return Err(OpenescrowError::InvalidAccount {
                    reason: format!("vault {} belongs to no active record", vault.id),
                });
            }
            program.custody.register(vault);
        }

        for record in snapshot.records {
            if !record.is_active() {
                return Err(OpenescrowError::InvalidAccount {
                    reason: format!("snapshot holds closed record {}", record.id),
                });
            }
            let expected = program.custody.derive_vault_id(&record.scope());
            if record.vault != expected || program.custody.vault(&record.vault).is_none() {
                return Err(OpenescrowError::InvalidAccount {
                    reason: format!("record {} has no matching vault", record.id),
                });
            }
            if program.registry.is_occupied(&record.scope()) {
                return Err(OpenescrowError::AlreadyExists(record.scope()));
            }
            program.registry.insert(record);
        }
        program.nonces = snapshot.nonces.into_iter().collect();

        info!(
            records = program.registry.active_count(),
            "Escrow program restored"
        );
        Ok(program)
    }
}
