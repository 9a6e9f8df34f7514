//! Configuration for an OpenEscrow settlement program.

use serde::{Deserialize, Serialize};

use crate::{OpenescrowError, ProgramId, Result, constants};

/// Fixed configuration every custody derivation depends on.
///
/// Changing any seed or the program id changes every derived authority and
/// vault address, so a running program never mutates its config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowConfig {
    /// Identity of the deployed program.
    pub program_id: ProgramId,
    /// Namespace tag for vault authority derivation.
    pub authority_seed: String,
    /// Namespace tag for vault address derivation.
    pub vault_seed: String,
    /// How many closed record ids to remember.
    pub closed_record_cache_size: usize,
}

impl Default for EscrowConfig {
    fn default() -> Self {
        Self {
            program_id: ProgramId::from_label(constants::DEFAULT_PROGRAM_LABEL),
            authority_seed: constants::DEFAULT_AUTHORITY_SEED.to_string(),
            vault_seed: constants::DEFAULT_VAULT_SEED.to_string(),
            closed_record_cache_size: constants::DEFAULT_CLOSED_RECORD_CACHE_SIZE,
        }
    }
}

impl EscrowConfig {
    /// Parse and validate a JSON config document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the config is usable.
    pub fn validate(&self) -> Result<()> {
        if self.authority_seed.is_empty() || self.vault_seed.is_empty() {
            return Err(OpenescrowError::Configuration(
                "derivation seeds must be non-empty".to_string(),
            ));
        }
        if self.authority_seed == self.vault_seed {
            return Err(OpenescrowError::Configuration(
                "authority and vault seeds must differ".to_string(),
            ));
        }
        if self.closed_record_cache_size == 0 {
            return Err(OpenescrowError::Configuration(
                "closed_record_cache_size must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
