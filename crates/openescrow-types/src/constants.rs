//! System-wide constants for the OpenEscrow settlement protocol.

/// Label the default `ProgramId` is derived from.
pub const DEFAULT_PROGRAM_LABEL: &str = "openescrow";

/// Default seed namespacing vault authority derivations.
pub const DEFAULT_AUTHORITY_SEED: &str = "vault-authority";

/// Default seed namespacing vault address derivations.
pub const DEFAULT_VAULT_SEED: &str = "vault-account";

/// Domain separator for authority derivation.
pub const AUTHORITY_DOMAIN: &[u8] = b"openescrow:authority:v1:";

/// Domain separator for vault address derivation.
pub const VAULT_DOMAIN: &[u8] = b"openescrow:vault:v1:";

/// Domain separator for instruction signing payloads.
pub const INSTRUCTION_DOMAIN: &[u8] = b"openescrow:instruction:v1:";

/// Domain separator for settlement result digests.
pub const SETTLEMENT_DOMAIN: &[u8] = b"openescrow:settlement:v1:";

/// Number of closed record ids remembered for `RecordClosed` answers.
pub const DEFAULT_CLOSED_RECORD_CACHE_SIZE: usize = 100_000;
