//! # openescrow-ledger
//!
//! The token ledger the settlement core runs against: token accounts per
//! (mint, owner), authority-gated transfers, and an all-or-nothing commit
//! boundary.
//!
//! ## Commit Boundary
//!
//! ```text
//! LedgerBatch [open, transfer, transfer, close, ...]
//!     → TokenLedger::commit()
//!         → stage every op on an overlay of touched accounts
//!         → any failure: discard overlay, ledger unchanged
//!         → success: write overlay back in one step
//! ```
//!
//! [`SupplyConservation`] checks that per-mint supply equals the sum of all
//! balances, custody vaults included.

pub mod account;
pub mod batch;
pub mod ledger;
pub mod supply_conservation;

pub use account::TokenAccount;
pub use batch::{LedgerBatch, LedgerOp};
pub use ledger::TokenLedger;
pub use supply_conservation::SupplyConservation;
