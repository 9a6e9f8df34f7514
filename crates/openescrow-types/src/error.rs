//! Error types for the OpenEscrow settlement protocol.
//!
//! All errors use the `OE_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Authorization errors
//! - 2xx: Escrow record errors
//! - 3xx: Amount / arithmetic errors
//! - 4xx: Ledger errors
//! - 8xx: Safety invariant errors
//! - 9xx: General / internal errors
//!
//! Every error is scoped to a single operation: when an operation fails,
//! no record, vault, or balance has changed.

use thiserror::Error;

use crate::{MintId, PartyId, RecordId, ScopeKey, TokenAccountId};

/// Central error enum for all OpenEscrow operations.
#[derive(Debug, Error)]
pub enum OpenescrowError {
    // =================================================================
    // Authorization Errors (1xx)
    // =================================================================
    /// The caller is not the party the operation requires.
    #[error("OE_ERR_100: Unauthorized: {reason}")]
    Unauthorized { reason: String },

    /// A supplied reference (account, mint, vault, record) does not match.
    #[error("OE_ERR_101: Invalid account: {reason}")]
    InvalidAccount { reason: String },

    /// The ed25519 signature on an instruction didn't verify.
    #[error("OE_ERR_102: Instruction signature verification failed")]
    SignatureInvalid,

    /// A signed envelope reused a nonce its signer has already spent.
    #[error("OE_ERR_103: Stale nonce {nonce} from {signer}: last accepted {last}")]
    NonceReplayed {
        signer: PartyId,
        nonce: u64,
        last: u64,
    },

    // =================================================================
    // Escrow Record Errors (2xx)
    // =================================================================
    /// An unclosed record already occupies this scope.
    #[error("OE_ERR_200: Escrow already exists for scope {0}")]
    AlreadyExists(ScopeKey),

    /// The record has reached its terminal state.
    #[error("OE_ERR_201: Escrow record closed: {0}")]
    RecordClosed(RecordId),

    // =================================================================
    // Amount / Arithmetic Errors (3xx)
    // =================================================================
    /// A non-positive amount was supplied.
    #[error("OE_ERR_300: Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// A withdrawal exceeds the available balance.
    #[error("OE_ERR_301: Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    /// A debit would take a balance below zero.
    #[error("OE_ERR_302: Arithmetic underflow")]
    Underflow,

    /// An intermediate or resulting amount exceeds the numeric range.
    #[error("OE_ERR_303: Arithmetic overflow")]
    Overflow,

    // =================================================================
    // Ledger Errors (4xx)
    // =================================================================
    /// No ledger account with this id.
    #[error("OE_ERR_400: Token account not found: {0}")]
    AccountNotFound(TokenAccountId),

    /// A ledger account with this id already exists.
    #[error("OE_ERR_401: Token account already exists: {0}")]
    AccountExists(TokenAccountId),

    /// Accounts can only be closed at zero balance.
    #[error("OE_ERR_402: Token account {account} not empty: balance {balance}")]
    AccountNotEmpty {
        account: TokenAccountId,
        balance: u64,
    },

    /// A transfer crossed asset kinds.
    #[error("OE_ERR_403: Mint mismatch: expected {expected}, got {actual}")]
    MintMismatch { expected: MintId, actual: MintId },

    // =================================================================
    // Safety Errors (8xx)
    // =================================================================
    /// Supply conservation invariant violated. Critical safety alert.
    #[error("OE_ERR_800: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("OE_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("OE_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("OE_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// I/O error.
    #[error("OE_ERR_903: I/O error: {0}")]
    Io(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, OpenescrowError>;

impl From<std::io::Error> for OpenescrowError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for OpenescrowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MintId;

    #[test]
    fn insufficient_funds_display() {
        let err = OpenescrowError::InsufficientFunds {
            needed: 500,
            available: 250,
        };
        let msg = format!("{err}");
        assert!(msg.starts_with("OE_ERR_301"), "Got: {msg}");
        assert!(msg.contains("500"));
        assert!(msg.contains("250"));
    }

    #[test]
    fn already_exists_names_scope() {
        let scope = ScopeKey::new(PartyId([1u8; 32]), MintId([2u8; 32]));
        let msg = format!("{}", OpenescrowError::AlreadyExists(scope));
        assert!(msg.contains("OE_ERR_200"));
        assert!(msg.contains("party:"));
    }

    #[test]
    fn all_errors_have_oe_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(OpenescrowError::Unauthorized {
                reason: "test".into(),
            }),
            Box::new(OpenescrowError::SignatureInvalid),
            Box::new(OpenescrowError::NonceReplayed {
                signer: PartyId([3u8; 32]),
                nonce: 1,
                last: 1,
            }),
            Box::new(OpenescrowError::RecordClosed(RecordId::new())),
            Box::new(OpenescrowError::Underflow),
            Box::new(OpenescrowError::Overflow),
            Box::new(OpenescrowError::AccountNotFound(TokenAccountId::new())),
            Box::new(OpenescrowError::Internal("test".into())),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("OE_ERR_"),
                "Error missing OE_ERR_ prefix: {msg}"
            );
        }
    }

    #[test]
    fn serde_json_error_converts() {
        let err = serde_json::from_str::<u64>("not a number").unwrap_err();
        let converted: OpenescrowError = err.into();
        assert!(matches!(converted, OpenescrowError::Serialization(_)));
    }
}
