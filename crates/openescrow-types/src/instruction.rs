//! Instructions and signed instruction envelopes.
//!
//! The three operations arrive as an [`Instruction`]. A caller proves who
//! it is by signing the instruction's canonical payload with its ed25519
//! key; [`SignedInstruction::verify`] turns a valid envelope into a
//! [`Signer`] the settlement core can trust.
//!
//! Every envelope carries a per-signer nonce inside the signed payload.
//! The program accepts each signer's nonces in strictly increasing order,
//! so a captured envelope cannot be run a second time.

use ed25519_dalek::{Signature, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::{
    MintId, OpenescrowError, PartyId, RecordId, Result, TokenAccountId, VaultId, constants,
};

/// Inputs to Initialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializeArgs {
    pub initializer: PartyId,
    pub deposit_mint: MintId,
    pub counter_mint: MintId,
    pub deposit_amount: u64,
    pub counter_amount: u64,
    /// Initializer account funding the deposit.
    pub release_account: TokenAccountId,
    /// Initializer account receiving the counter-asset.
    pub receive_account: TokenAccountId,
}

/// Inputs to Exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeArgs {
    pub taker: PartyId,
    pub record: RecordId,
    pub vault: VaultId,
    /// Counter-asset units the taker pays.
    pub offered_amount: u64,
    /// Taker account paying the counter-asset.
    pub taker_release_account: TokenAccountId,
    /// Taker account receiving the deposit asset.
    pub taker_receive_account: TokenAccountId,
    /// Must equal the record's receive account.
    pub initializer_receive_account: TokenAccountId,
}

/// Inputs to Cancel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelArgs {
    pub initializer: PartyId,
    pub record: RecordId,
    pub vault: VaultId,
    /// Must equal the record's release account.
    pub release_account: TokenAccountId,
}

/// One settlement operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    Initialize(InitializeArgs),
    Exchange(ExchangeArgs),
    Cancel(CancelArgs),
}

impl Instruction {
    /// The party the instruction claims to act for.
    #[must_use]
    pub fn claimed_caller(&self) -> PartyId {
        match self {
            Self::Initialize(args) => args.initializer,
            Self::Exchange(args) => args.taker,
            Self::Cancel(args) => args.initializer,
        }
    }

    /// Short name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initialize(_) => "initialize",
            Self::Exchange(_) => "exchange",
            Self::Cancel(_) => "cancel",
        }
    }

    /// Canonical signing payload for this instruction under `nonce`.
    ///
    /// Format: `"openescrow:instruction:v1:" || nonce || tag || fields...`
    /// with integers little-endian and ids as raw bytes.
    #[must_use]
    pub fn signing_payload(&self, nonce: u64) -> Vec<u8> {
        let mut payload = Vec::with_capacity(256);
        payload.extend_from_slice(constants::INSTRUCTION_DOMAIN);
        payload.extend_from_slice(&nonce.to_le_bytes());
        match self {
            Self::Initialize(args) => {
                payload.push(0);
                payload.extend_from_slice(args.initializer.as_bytes());
                payload.extend_from_slice(args.deposit_mint.as_bytes());
                payload.extend_from_slice(args.counter_mint.as_bytes());
                payload.extend_from_slice(&args.deposit_amount.to_le_bytes());
                payload.extend_from_slice(&args.counter_amount.to_le_bytes());
                payload.extend_from_slice(args.release_account.0.as_bytes());
                payload.extend_from_slice(args.receive_account.0.as_bytes());
            }
            Self::Exchange(args) => {
                payload.push(1);
                payload.extend_from_slice(args.taker.as_bytes());
                payload.extend_from_slice(args.record.0.as_bytes());
                payload.extend_from_slice(&args.vault.0);
                payload.extend_from_slice(&args.offered_amount.to_le_bytes());
                payload.extend_from_slice(args.taker_release_account.0.as_bytes());
                payload.extend_from_slice(args.taker_receive_account.0.as_bytes());
                payload.extend_from_slice(args.initializer_receive_account.0.as_bytes());
            }
            Self::Cancel(args) => {
                payload.push(2);
                payload.extend_from_slice(args.initializer.as_bytes());
                payload.extend_from_slice(args.record.0.as_bytes());
                payload.extend_from_slice(&args.vault.0);
                payload.extend_from_slice(args.release_account.0.as_bytes());
            }
        }
        payload
    }
}

/// Proof that a party authorised the current call.
///
/// Only obtainable from a signing key or a verified envelope, so a derived
/// authority can never act as a `Signer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signer {
    party: PartyId,
}

impl Signer {
    /// Holding the key is proof of identity.
    #[must_use]
    pub fn from_signing_key(key: &SigningKey) -> Self {
        Self {
            party: PartyId(key.verifying_key().to_bytes()),
        }
    }

    #[must_use]
    pub fn party(&self) -> PartyId {
        self.party
    }
}

/// An instruction plus the caller's ed25519 signature over its payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedInstruction {
    pub instruction: Instruction,
    pub signer: PartyId,
    /// Must exceed every nonce the program has accepted from `signer`.
    pub nonce: u64,
    pub signature: Vec<u8>,
}

impl SignedInstruction {
    /// Sign `instruction` under `nonce` with `key`.
    #[must_use]
    pub fn sign(key: &SigningKey, nonce: u64, instruction: Instruction) -> Self {
        use ed25519_dalek::Signer as _;
        let signature = key.sign(&instruction.signing_payload(nonce));
        Self {
            instruction,
            signer: PartyId(key.verifying_key().to_bytes()),
            nonce,
            signature: signature.to_bytes().to_vec(),
        }
    }

    /// Verify the signature and hand back the authenticated caller.
    ///
    /// # Errors
    /// Returns `SignatureInvalid` if the key or signature is malformed or
    /// the signature does not cover this instruction and nonce. Freshness
    /// of the nonce is the program's check.
    pub fn verify(self) -> Result<(Signer, Instruction)> {
        let key = VerifyingKey::from_bytes(self.signer.as_bytes())
            .map_err(|_| OpenescrowError::SignatureInvalid)?;
        let signature = Signature::from_slice(&self.signature)
            .map_err(|_| OpenescrowError::SignatureInvalid)?;
        key.verify(&self.instruction.signing_payload(self.nonce), &signature)
            .map_err(|_| OpenescrowError::SignatureInvalid)?;
        Ok((Signer { party: self.signer }, self.instruction))
    }
}

/// Fresh random signing key for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
#[must_use]
pub fn random_signing_key() -> SigningKey {
    SigningKey::from_bytes(&rand::random::<[u8; 32]>())
}
