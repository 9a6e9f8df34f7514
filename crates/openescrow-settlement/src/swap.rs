//! Swap engine: proportional fills and the three-way transfer.
//!
//! Every fill is priced at the rate fixed when the offer was created:
//!
//! ```text
//! released = floor(offered * deposit_amount_original / counter_amount_expected)
//! ```
//!
//! The vault's remaining balance only caps how much can be released; it
//! never changes the rate. Flooring means the taker receives at most their
//! proportional due.
//!
//! One exchange stages, in order:
//! 1. taker release account → initializer receive account (`offered`)
//! 2. vault → taker receive account (`released`, signed by the derived authority)
//! 3. close the vault account, if it is now empty
//!
//! and commits them as a single ledger batch.

use openescrow_ledger::{LedgerBatch, TokenLedger};
use openescrow_types::{
    EscrowRecord, ExchangeArgs, OpenescrowError, Owner, Result, SettlementKind, SettlementResult,
    Vault,
};

use crate::custody::VaultCustody;

/// Amounts for one exchange, computed before anything is staged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fill {
    /// Counter-asset units the taker pays.
    pub offered: u64,
    /// Deposit units the vault releases.
    pub released: u64,
    /// Vault balance after the fill.
    pub remaining: u64,
}

impl Fill {
    /// Whether this fill empties the vault.
    #[must_use]
    pub fn closes(&self) -> bool {
        self.remaining == 0
    }
}

/// Computes fills and drives exchange settlement.
pub struct SwapEngine;

impl SwapEngine {
    /// Deposit units owed for `offered` counter units at the original rate.
    ///
    /// # Errors
    /// - `Overflow` if `offered * deposit_amount_original` exceeds `u64`
    /// - `InvalidAmount` if the offer is zero, the rate is undefined, or the
    ///   offer is too small to release a single unit
    pub fn release_amount(
        offered: u64,
        deposit_amount_original: u64,
        counter_amount_expected: u64,
    ) -> Result<u64> {
        if offered == 0 {
            return Err(OpenescrowError::InvalidAmount {
                reason: "offered amount must be positive".to_string(),
            });
        }
        if counter_amount_expected == 0 {
            return Err(OpenescrowError::InvalidAmount {
                reason: "counter amount expected must be positive".to_string(),
            });
        }
        let product = offered
            .checked_mul(deposit_amount_original)
            .ok_or(OpenescrowError::Overflow)?;
        let released = product / counter_amount_expected;
        if released == 0 {
            return Err(OpenescrowError::InvalidAmount {
                reason: format!("offer of {offered} releases nothing at the escrow rate"),
            });
        }
        Ok(released)
    }

    /// Price an exchange against the vault's current balance.
    ///
    /// # Errors
    /// Everything [`Self::release_amount`] returns, plus
    /// `InsufficientFunds` if the fill would release more than the vault holds.
    pub fn quote(record: &EscrowRecord, vault_balance: u64, offered: u64) -> Result<Fill> {
        let released = Self::release_amount(
            offered,
            record.deposit_amount_original,
            record.counter_amount_expected,
        )?;
        if released > vault_balance {
            return Err(OpenescrowError::InsufficientFunds {
                needed: released,
                available: vault_balance,
            });
        }
        Ok(Fill {
            offered,
            released,
            remaining: vault_balance - released,
        })
    }

    /// Settle one exchange against `record` atomically.
    ///
    /// Either every transfer lands (and the vault is closed if emptied) or
    /// the ledger is unchanged. Registry bookkeeping is the caller's job.
    pub fn exchange(
        ledger: &mut TokenLedger,
        custody: &VaultCustody,
        record: &EscrowRecord,
        vault: &Vault,
        args: &ExchangeArgs,
    ) -> Result<SettlementResult> {
        let vault_balance = ledger.balance(&vault.account);
        let fill = Self::quote(record, vault_balance, args.offered_amount)?;
        let authority = custody.derive_authority(&record.scope());

        let mut batch = LedgerBatch::new();
        batch.transfer(
            args.taker_release_account,
            record.receive_account,
            fill.offered,
            Owner::Party(args.taker),
        );
        let remaining = custody.release(
            vault,
            authority,
            fill.released,
            args.taker_receive_account,
            vault_balance,
            &mut batch,
        )?;
        if fill.closes() {
            custody.close(vault, authority, &mut batch)?;
        }

        ledger.commit(batch)?;

        Ok(SettlementResult::new(
            record.id,
            SettlementKind::Exchange,
            fill.offered,
            fill.released,
            args.taker_receive_account,
            remaining,
        ))
    }
}
