//! Vault custody: deposits and releases under a derived authority.
//!
//! Each scope gets its own vault: a ledger account owned by an
//! [`AuthorityId`] that is a pure SHA-256 function of the program id, a
//! namespace seed, and the scope key. No private key exists for it. Every
//! release recomputes the authority and checks it before staging a debit,
//! and the ledger checks ownership again at commit.
//!
//! Custody never writes to the ledger directly: operations stage onto a
//! [`LedgerBatch`] that the caller commits as one unit.

use std::collections::HashMap;

use openescrow_ledger::{LedgerBatch, TokenLedger};
use openescrow_types::{
    AuthorityId, EscrowConfig, OpenescrowError, Owner, PartyId, ProgramId, Result, ScopeKey,
    TokenAccountId, Vault, VaultId, constants,
};
use sha2::{Digest, Sha256};

/// Derives vault identities and stages custody movements.
pub struct VaultCustody {
    program_id: ProgramId,
    authority_seed: String,
    vault_seed: String,
    /// Vaults whose ledger account is open.
    vaults: HashMap<VaultId, Vault>,
}

impl VaultCustody {
    #[must_use]
    pub fn new(config: &EscrowConfig) -> Self {
        Self {
            program_id: config.program_id,
            authority_seed: config.authority_seed.clone(),
            vault_seed: config.vault_seed.clone(),
            vaults: HashMap::new(),
        }
    }

    /// The authority for a scope. Pure: same input, same output.
    #[must_use]
    pub fn derive_authority(&self, scope: &ScopeKey) -> AuthorityId {
        AuthorityId(self.derive(constants::AUTHORITY_DOMAIN, &self.authority_seed, scope))
    }

    /// The vault address for a scope.
    #[must_use]
    pub fn derive_vault_id(&self, scope: &ScopeKey) -> VaultId {
        VaultId(self.derive(constants::VAULT_DOMAIN, &self.vault_seed, scope))
    }

    fn derive(&self, domain: &[u8], seed: &str, scope: &ScopeKey) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        hasher.update(self.program_id.0);
        hasher.update((seed.len() as u64).to_le_bytes());
        hasher.update(seed.as_bytes());
        hasher.update(scope.initializer.as_bytes());
        hasher.update(scope.deposit_mint.as_bytes());
        hasher.finalize().into()
    }

    /// Full vault descriptor for a scope, derived from configuration alone.
    #[must_use]
    pub fn describe(&self, scope: &ScopeKey) -> Vault {
        let id = self.derive_vault_id(scope);
        Vault {
            id,
            scope: *scope,
            mint: scope.deposit_mint,
            account: id.token_account(),
            authority: self.derive_authority(scope),
        }
    }

    /// Stage creation of the vault's ledger account.
    pub fn open(&self, vault: &Vault, batch: &mut LedgerBatch) {
        batch.open_account(vault.account, vault.mint, Owner::Authority(vault.authority));
    }

    /// Stage a deposit of `amount` from `from` into the vault.
    ///
    /// Coverage of `from` is checked by the ledger at commit
    /// (`InsufficientFunds`).
    ///
    /// # Errors
    /// Returns `InvalidAmount` for a zero amount.
    pub fn deposit(
        &self,
        vault: &Vault,
        amount: u64,
        from: TokenAccountId,
        depositor: PartyId,
        batch: &mut LedgerBatch,
    ) -> Result<()> {
        if amount == 0 {
            return Err(OpenescrowError::InvalidAmount {
                reason: "deposit amount must be positive".to_string(),
            });
        }
        batch.transfer(from, vault.account, amount, Owner::Party(depositor));
        Ok(())
    }

    /// Stage a release of `amount` from the vault to `to`.
    ///
    /// `vault_balance` is the balance the caller observed; the returned value
    /// is the balance left after the release.
    ///
    /// # Errors
    /// - `Unauthorized` if `caller` is not the authority derived for the vault
    /// - `InvalidAmount` for a zero amount
    /// - `Underflow` if `amount > vault_balance`
    pub fn release(
        &self,
        vault: &Vault,
        caller: AuthorityId,
        amount: u64,
        to: TokenAccountId,
        vault_balance: u64,
        batch: &mut LedgerBatch,
    ) -> Result<u64> {
        self.check_authority(vault, caller)?;
        if amount == 0 {
            return Err(OpenescrowError::InvalidAmount {
                reason: "release amount must be positive".to_string(),
            });
        }
        let remaining = vault_balance
            .checked_sub(amount)
            .ok_or(OpenescrowError::Underflow)?;
        batch.transfer(vault.account, to, amount, Owner::Authority(caller));
        Ok(remaining)
    }

    /// Stage closing the emptied vault account.
    ///
    /// # Errors
    /// Returns `Unauthorized` if `caller` is not the vault's authority.
    pub fn close(&self, vault: &Vault, caller: AuthorityId, batch: &mut LedgerBatch) -> Result<()> {
        self.check_authority(vault, caller)?;
        batch.close_account(vault.account, Owner::Authority(caller));
        Ok(())
    }

    fn check_authority(&self, vault: &Vault, caller: AuthorityId) -> Result<()> {
        let derived = self.derive_authority(&vault.scope);
        if caller != derived || vault.authority != derived {
            tracing::warn!(vault = %vault.id, caller = %caller, "Release by non-authority refused");
            return Err(OpenescrowError::Unauthorized {
                reason: format!("{caller} is not the custody authority of {}", vault.id),
            });
        }
        Ok(())
    }

    /// Track a vault whose account has been committed.
    pub fn register(&mut self, vault: Vault) {
        tracing::debug!(vault = %vault.id, authority = %vault.authority, "Vault opened");
        self.vaults.insert(vault.id, vault);
    }

    /// Stop tracking a vault whose account has been closed.
    pub fn retire(&mut self, vault_id: &VaultId) -> Option<Vault> {
        self.vaults.remove(vault_id)
    }

    #[must_use]
    pub fn vault(&self, vault_id: &VaultId) -> Option<&Vault> {
        self.vaults.get(vault_id)
    }

    /// Live balance of a tracked vault.
    ///
    /// # Errors
    /// Returns `InvalidAccount` if the vault isn't open.
    pub fn balance(&self, ledger: &TokenLedger, vault_id: &VaultId) -> Result<u64> {
        let vault = self
            .vaults
            .get(vault_id)
            .ok_or_else(|| OpenescrowError::InvalidAccount {
                reason: format!("no open vault {vault_id}"),
            })?;
        Ok(ledger.balance(&vault.account))
    }

    /// All open vaults.
    #[must_use]
    pub fn vaults(&self) -> Vec<&Vault> {
        let mut vaults: Vec<&Vault> = self.vaults.values().collect();
        vaults.sort_by_key(|vault| vault.id);
        vaults
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openescrow_types::{MintId, ProgramId};

    fn scope(byte: u8) -> ScopeKey {
        ScopeKey::new(PartyId([byte; 32]), MintId::from_label("A"))
    }

    /// Ledger with one funded depositor account and an opened, funded vault.
    fn funded(custody: &VaultCustody, amount: u64) -> (TokenLedger, Vault, TokenAccountId) {
        let mut ledger = TokenLedger::new();
        let s = scope(1);
        let from = ledger.create_account(s.deposit_mint, Owner::Party(s.initializer));
        ledger.mint_to(from, amount).unwrap();

        let vault = custody.describe(&s);
        let mut batch = LedgerBatch::new();
        custody.open(&vault, &mut batch);
        custody
            .deposit(&vault, amount, from, s.initializer, &mut batch)
            .unwrap();
        ledger.commit(batch).unwrap();
        (ledger, vault, from)
    }

    #[test]
    fn derivation_is_deterministic() {
        let custody = VaultCustody::new(&EscrowConfig::default());
        let other = VaultCustody::new(&EscrowConfig::default());
        assert_eq!(custody.derive_authority(&scope(1)), other.derive_authority(&scope(1)));
        assert_eq!(custody.derive_vault_id(&scope(1)), other.derive_vault_id(&scope(1)));
    }

    #[test]
    fn derivation_separates_scopes_and_roles() {
        let custody = VaultCustody::new(&EscrowConfig::default());
        assert_ne!(custody.derive_authority(&scope(1)), custody.derive_authority(&scope(2)));
        assert_ne!(
            custody.derive_authority(&scope(1)).0,
            custody.derive_vault_id(&scope(1)).0
        );
        let other_mint = ScopeKey::new(PartyId([1u8; 32]), MintId::from_label("B"));
        assert_ne!(custody.derive_vault_id(&scope(1)), custody.derive_vault_id(&other_mint));
    }

    #[test]
    fn derivation_depends_on_program() {
        let a = VaultCustody::new(&EscrowConfig::default());
        let b = VaultCustody::new(&EscrowConfig {
            program_id: ProgramId::from_label("other"),
            ..EscrowConfig::default()
        });
        assert_ne!(a.derive_authority(&scope(1)), b.derive_authority(&scope(1)));
    }

    #[test]
    fn deposit_moves_funds_into_vault() {
        let custody = VaultCustody::new(&EscrowConfig::default());
        let (ledger, vault, from) = funded(&custody, 500);
        assert_eq!(ledger.balance(&vault.account), 500);
        assert_eq!(ledger.balance(&from), 0);
        let acct = ledger.account(&vault.account).unwrap();
        assert_eq!(acct.owner, Owner::Authority(vault.authority));
    }

    #[test]
    fn release_by_authority() {
        let custody = VaultCustody::new(&EscrowConfig::default());
        let (mut ledger, vault, from) = funded(&custody, 500);
        let authority = custody.derive_authority(&vault.scope);

        let mut batch = LedgerBatch::new();
        let remaining = custody
            .release(&vault, authority, 200, from, 500, &mut batch)
            .unwrap();
        assert_eq!(remaining, 300);
        ledger.commit(batch).unwrap();
        assert_eq!(ledger.balance(&vault.account), 300);
        assert_eq!(ledger.balance(&from), 200);
    }

    #[test]
    fn release_by_other_authority_refused() {
        let custody = VaultCustody::new(&EscrowConfig::default());
        let (_, vault, from) = funded(&custody, 500);
        let imposter = custody.derive_authority(&scope(2));

        let mut batch = LedgerBatch::new();
        let err = custody
            .release(&vault, imposter, 100, from, 500, &mut batch)
            .unwrap_err();
        assert!(matches!(err, OpenescrowError::Unauthorized { .. }));
        assert!(batch.is_empty());
    }

    #[test]
    fn release_more_than_balance_underflows() {
        let custody = VaultCustody::new(&EscrowConfig::default());
        let (_, vault, from) = funded(&custody, 500);
        let authority = custody.derive_authority(&vault.scope);
        let mut batch = LedgerBatch::new();
        let err = custody
            .release(&vault, authority, 501, from, 500, &mut batch)
            .unwrap_err();
        assert!(matches!(err, OpenescrowError::Underflow));
    }

    #[test]
    fn zero_deposit_rejected() {
        let custody = VaultCustody::new(&EscrowConfig::default());
        let vault = custody.describe(&scope(1));
        let mut batch = LedgerBatch::new();
        let err = custody
            .deposit(&vault, 0, TokenAccountId::new(), scope(1).initializer, &mut batch)
            .unwrap_err();
        assert!(matches!(err, OpenescrowError::InvalidAmount { .. }));
    }

    #[test]
    fn underfunded_deposit_fails_at_commit() {
        let custody = VaultCustody::new(&EscrowConfig::default());
        let mut ledger = TokenLedger::new();
        let s = scope(1);
        let from = ledger.create_account(s.deposit_mint, Owner::Party(s.initializer));
        ledger.mint_to(from, 100).unwrap();

        let vault = custody.describe(&s);
        let mut batch = LedgerBatch::new();
        custody.open(&vault, &mut batch);
        custody
            .deposit(&vault, 500, from, s.initializer, &mut batch)
            .unwrap();
        let err = ledger.commit(batch).unwrap_err();
        assert!(matches!(err, OpenescrowError::InsufficientFunds { .. }));
        assert!(!ledger.contains(&vault.account));
    }

    #[test]
    fn register_and_retire() {
        let mut custody = VaultCustody::new(&EscrowConfig::default());
        let (ledger, vault, _) = funded(&custody, 500);
        custody.register(vault.clone());
        assert_eq!(custody.balance(&ledger, &vault.id).unwrap(), 500);
        assert_eq!(custody.vaults().len(), 1);
        assert_eq!(custody.retire(&vault.id), Some(vault.clone()));
        assert!(custody.balance(&ledger, &vault.id).is_err());
    }
}
