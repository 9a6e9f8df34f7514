//! In-process token ledger.
//!
//! Holds every token account and is the source of truth for balances,
//! custody vaults included. Fixture-style calls (`create_account`,
//! `mint_to`) apply immediately; settlement goes through
//! [`TokenLedger::commit`], which is all-or-nothing.

use std::collections::HashMap;

use openescrow_types::{MintId, OpenescrowError, Owner, Result, TokenAccountId};

use crate::account::TokenAccount;
use crate::batch::{LedgerBatch, LedgerOp};
use crate::supply_conservation::SupplyConservation;

/// Staged view of touched accounts. `None` means "does not exist".
type Overlay = HashMap<TokenAccountId, Option<TokenAccount>>;

/// Token accounts keyed by id, with authority-gated transfers.
#[derive(Debug, Default)]
pub struct TokenLedger {
    accounts: HashMap<TokenAccountId, TokenAccount>,
    supply: SupplyConservation,
}

impl TokenLedger {
    #[must_use]
    pub fn new() -> Self {
        Self {
            accounts: HashMap::new(),
            supply: SupplyConservation::new(),
        }
    }

    /// Create an empty account for `owner`.
    pub fn create_account(&mut self, mint: MintId, owner: Owner) -> TokenAccountId {
        let id = TokenAccountId::new();
        self.accounts.insert(id, TokenAccount::new(id, mint, owner));
        id
    }

    /// Issue new supply into an account.
    ///
    /// # Errors
    /// - `AccountNotFound` if the account doesn't exist
    /// - `Overflow` if the balance or the mint's supply would overflow
    pub fn mint_to(&mut self, account: TokenAccountId, amount: u64) -> Result<()> {
        let entry = self
            .accounts
            .get_mut(&account)
            .ok_or(OpenescrowError::AccountNotFound(account))?;
        let new_amount = entry
            .amount
            .checked_add(amount)
            .ok_or(OpenescrowError::Overflow)?;
        self.supply.record_mint(entry.mint, amount)?;
        entry.amount = new_amount;
        Ok(())
    }

    #[must_use]
    pub fn account(&self, id: &TokenAccountId) -> Option<&TokenAccount> {
        self.accounts.get(id)
    }

    /// Balance of an account; zero if it doesn't exist.
    #[must_use]
    pub fn balance(&self, id: &TokenAccountId) -> u64 {
        self.accounts.get(id).map_or(0, |acct| acct.amount)
    }

    #[must_use]
    pub fn contains(&self, id: &TokenAccountId) -> bool {
        self.accounts.contains_key(id)
    }

    /// Apply every op in `batch`, or none of them.
    ///
    /// Ops run in order against an overlay of the accounts they touch. The
    /// first failing op aborts the batch and the ledger is left exactly as
    /// it was.
    ///
    /// # Errors
    /// - `AccountNotFound` / `AccountExists` for missing or duplicate accounts
    /// - `Unauthorized` if `authority` doesn't own the debited/closed account
    /// - `MintMismatch` if a transfer crosses mints
    /// - `InvalidAmount` for a zero transfer, `InvalidAccount` for a self-transfer
    /// - `InsufficientFunds` if the source can't cover the amount
    /// - `Overflow` if a credit exceeds `u64`
    /// - `AccountNotEmpty` when closing an account with a balance
    pub fn commit(&mut self, batch: LedgerBatch) -> Result<()> {
        let mut overlay = Overlay::new();
        for op in batch.ops() {
            Self::stage(&self.accounts, &mut overlay, op)?;
        }

        let touched = overlay.len();
        for (id, slot) in overlay {
            match slot {
                Some(account) => {
                    self.accounts.insert(id, account);
                }
                None => {
                    self.accounts.remove(&id);
                }
            }
        }

        tracing::debug!(ops = batch.len(), touched, "Ledger batch committed");
        Ok(())
    }

    /// Sum of all balances of a mint.
    #[must_use]
    pub fn total_supply(&self, mint: &MintId) -> u128 {
        self.accounts
            .values()
            .filter(|acct| acct.mint == *mint)
            .map(|acct| u128::from(acct.amount))
            .sum()
    }

    /// Verify supply conservation for a mint.
    pub fn verify_supply(&self, mint: &MintId) -> Result<()> {
        self.supply.verify(mint, self.total_supply(mint))
    }

    /// Verify supply conservation for every mint ever issued.
    pub fn verify_all_supply(&self) -> Result<()> {
        for mint in self.supply.tracked_mints() {
            self.verify_supply(&mint)?;
        }
        Ok(())
    }

    /// Stage one op on the overlay.
    fn stage(
        accounts: &HashMap<TokenAccountId, TokenAccount>,
        overlay: &mut Overlay,
        op: &LedgerOp,
    ) -> Result<()> {
        match *op {
            LedgerOp::OpenAccount { id, mint, owner } => {
                let slot = overlay
                    .entry(id)
                    .or_insert_with(|| accounts.get(&id).cloned());
                if slot.is_some() {
                    return Err(OpenescrowError::AccountExists(id));
                }
                *slot = Some(TokenAccount::new(id, mint, owner));
            }
            LedgerOp::Transfer {
                from,
                to,
                amount,
                authority,
            } => {
                if amount == 0 {
                    return Err(OpenescrowError::InvalidAmount {
                        reason: "transfer amount must be positive".to_string(),
                    });
                }
                if from == to {
                    return Err(OpenescrowError::InvalidAccount {
                        reason: format!("transfer source and destination are both {from}"),
                    });
                }

                let to_mint = Self::load(accounts, overlay, to)?.mint;

                let source = Self::load(accounts, overlay, from)?;
                if !source.is_owned_by(authority) {
                    return Err(OpenescrowError::Unauthorized {
                        reason: format!("{authority} does not own {from}"),
                    });
                }
                if source.mint != to_mint {
                    return Err(OpenescrowError::MintMismatch {
                        expected: source.mint,
                        actual: to_mint,
                    });
                }
                let available = source.amount;
                source.amount = available
                    .checked_sub(amount)
                    .ok_or(OpenescrowError::InsufficientFunds {
                        needed: amount,
                        available,
                    })?;

                let dest = Self::load(accounts, overlay, to)?;
                dest.amount = dest
                    .amount
                    .checked_add(amount)
                    .ok_or(OpenescrowError::Overflow)?;
            }
            LedgerOp::CloseAccount { account, authority } => {
                let acct = Self::load(accounts, overlay, account)?;
                if !acct.is_owned_by(authority) {
                    return Err(OpenescrowError::Unauthorized {
                        reason: format!("{authority} does not own {account}"),
                    });
                }
                if acct.amount != 0 {
                    return Err(OpenescrowError::AccountNotEmpty {
                        account,
                        balance: acct.amount,
                    });
                }
                overlay.insert(account, None);
            }
        }
        Ok(())
    }

    /// Current staged state of an account, pulled into the overlay on first use.
    fn load<'o>(
        accounts: &HashMap<TokenAccountId, TokenAccount>,
        overlay: &'o mut Overlay,
        id: TokenAccountId,
    ) -> Result<&'o mut TokenAccount> {
        overlay
            .entry(id)
            .or_insert_with(|| accounts.get(&id).cloned())
            .as_mut()
            .ok_or(OpenescrowError::AccountNotFound(id))
    }
}
