//! # openescrow-settlement
//!
//! **Settlement core**: record lifecycle, custody-authority derivation,
//! proportional swaps, and cancellation.
//!
//! ## Architecture
//!
//! An operation enters [`EscrowProgram`] as Initialize, Exchange, or Cancel
//! (directly, or as a [`SignedInstruction`](openescrow_types::SignedInstruction)
//! through [`EscrowProgram::execute`]) and:
//! 1. Passes the [`AuthorizationGuard`] (caller identity, reference consistency)
//! 2. Resolves the record in the [`EscrowRegistry`] (scoped by initializer + mint)
//! 3. Prices the fill with the [`SwapEngine`] at the original rate (Exchange)
//! 4. Stages vault movements through [`VaultCustody`] under the derived authority
//! 5. Commits everything as one ledger batch, then closes the record if the
//!    vault is empty
//!
//! ## Record lifecycle
//!
//! ```text
//! Initialize ──► ACTIVE ──partial Exchange──► ACTIVE
//!                  │
//!                  └──full Exchange / Cancel──► CLOSED (terminal)
//! ```

pub mod custody;
pub mod guard;
pub mod program;
pub mod registry;
pub mod swap;

pub use custody::VaultCustody;
pub use guard::AuthorizationGuard;
pub use program::{EscrowProgram, Outcome, ProgramSnapshot};
pub use registry::EscrowRegistry;
pub use swap::{Fill, SwapEngine};
