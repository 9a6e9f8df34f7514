//! # openescrow-types
//!
//! Shared types, errors, and configuration for the **OpenEscrow**
//! settlement protocol.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`PartyId`], [`MintId`], [`TokenAccountId`], [`AuthorityId`], [`VaultId`], [`ProgramId`], [`RecordId`], [`ScopeKey`], [`Owner`]
//! - **Escrow model**: [`EscrowRecord`], [`RecordState`], [`Vault`]
//! - **Instructions**: [`Instruction`], [`SignedInstruction`], [`Signer`]
//! - **Results**: [`SettlementResult`], [`SettlementKind`], [`EscrowEvent`]
//! - **Configuration**: [`EscrowConfig`]
//! - **Errors**: [`OpenescrowError`] with `OE_ERR_` prefix codes
//! - **Constants**: derivation seeds, domain separators, defaults

pub mod config;
pub mod constants;
pub mod error;
pub mod escrow;
pub mod ids;
pub mod instruction;
pub mod receipt;
pub mod vault;

pub use config::*;
pub use error::*;
pub use escrow::*;
pub use ids::*;
pub use instruction::*;
pub use receipt::*;
pub use vault::*;

// Constants are accessed via `openescrow_types::constants::FOO`
// (not re-exported to avoid name collisions).
