//! Staged ledger operations committed as one unit.

use openescrow_types::{MintId, Owner, TokenAccountId};

/// One staged ledger mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOp {
    /// Create an empty account.
    OpenAccount {
        id: TokenAccountId,
        mint: MintId,
        owner: Owner,
    },
    /// Move `amount` from `from` to `to`; `authority` must own `from`.
    Transfer {
        from: TokenAccountId,
        to: TokenAccountId,
        amount: u64,
        authority: Owner,
    },
    /// Remove a zero-balance account; `authority` must own it.
    CloseAccount {
        account: TokenAccountId,
        authority: Owner,
    },
}

/// Ordered list of ops applied all-or-nothing by
/// [`TokenLedger::commit`](crate::TokenLedger::commit).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerBatch {
    ops: Vec<LedgerOp>,
}

impl LedgerBatch {
    #[must_use]
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    pub fn open_account(&mut self, id: TokenAccountId, mint: MintId, owner: Owner) -> &mut Self {
        self.ops.push(LedgerOp::OpenAccount { id, mint, owner });
        self
    }

    pub fn transfer(
        &mut self,
        from: TokenAccountId,
        to: TokenAccountId,
        amount: u64,
        authority: Owner,
    ) -> &mut Self {
        self.ops.push(LedgerOp::Transfer {
            from,
            to,
            amount,
            authority,
        });
        self
    }

    pub fn close_account(&mut self, account: TokenAccountId, authority: Owner) -> &mut Self {
        self.ops.push(LedgerOp::CloseAccount { account, authority });
        self
    }

    #[must_use]
    pub fn ops(&self) -> &[LedgerOp] {
        &self.ops
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
