//! Authorization guard: structural and identity checks before any transfer.
//!
//! The guard never mutates state. It confirms that the caller is the party
//! the operation requires (`Unauthorized` otherwise) and that every supplied
//! reference agrees with the record and the ledger (`InvalidAccount`
//! otherwise). Record resolution happens here too, so an operation naming a
//! closed record fails with `RecordClosed` before anything else is checked.
//!
//! ## Checks
//!
//! | Operation  | Caller            | References |
//! |------------|-------------------|------------|
//! | Initialize | == initializer    | release: owned by caller, deposit mint; receive: counter mint; mints differ; scope free |
//! | Exchange   | == taker          | vault, initializer receive match record; taker release: owned by taker, counter mint; taker receive: deposit mint |
//! | Cancel     | == record initializer | vault, release account match record |

use openescrow_ledger::{TokenAccount, TokenLedger};
use openescrow_types::{
    CancelArgs, EscrowRecord, ExchangeArgs, InitializeArgs, MintId, OpenescrowError, Owner,
    PartyId, Result, ScopeKey, Signer, TokenAccountId,
};

use crate::registry::EscrowRegistry;

/// Stateless validation gate run before every operation.
pub struct AuthorizationGuard;

impl AuthorizationGuard {
    /// Validate an Initialize request.
    ///
    /// # Errors
    /// - `Unauthorized` if the signer isn't the initializer
    /// - `InvalidAccount` for a bad release/receive account or equal mints
    /// - `AlreadyExists` if the scope holds an unclosed record
    pub fn check_initialize(
        signer: &Signer,
        args: &InitializeArgs,
        ledger: &TokenLedger,
        registry: &EscrowRegistry,
    ) -> Result<()> {
        Self::require_signer(signer, args.initializer, "initializer")?;

        if args.deposit_mint == args.counter_mint {
            return Err(OpenescrowError::InvalidAccount {
                reason: format!("deposit and counter mint are both {}", args.deposit_mint),
            });
        }

        let release = Self::account(ledger, args.release_account, "release")?;
        Self::require_mint(release, args.deposit_mint, "release")?;
        Self::require_owner(release, args.initializer, "release")?;

        let receive = Self::account(ledger, args.receive_account, "receive")?;
        Self::require_mint(receive, args.counter_mint, "receive")?;

        let scope = ScopeKey::new(args.initializer, args.deposit_mint);
        if registry.is_occupied(&scope) {
            return Err(OpenescrowError::AlreadyExists(scope));
        }
        Ok(())
    }

    /// Validate an Exchange request and return the record it targets.
    ///
    /// # Errors
    /// - `RecordClosed` / `InvalidAccount` if the record isn't active
    /// - `Unauthorized` if the signer isn't the taker or doesn't own the
    ///   taker release account
    /// - `InvalidAccount` for any reference that disagrees with the record
    pub fn check_exchange(
        signer: &Signer,
        args: &ExchangeArgs,
        ledger: &TokenLedger,
        registry: &EscrowRegistry,
    ) -> Result<EscrowRecord> {
        let record = registry.resolve(&args.record)?;
        Self::require_signer(signer, args.taker, "taker")?;

        if args.vault != record.vault {
            return Err(OpenescrowError::InvalidAccount {
                reason: format!("vault {} does not belong to {}", args.vault, record.id),
            });
        }
        if args.initializer_receive_account != record.receive_account {
            return Err(OpenescrowError::InvalidAccount {
                reason: format!(
                    "initializer receive account {} does not match {}",
                    args.initializer_receive_account, record.receive_account
                ),
            });
        }

        let taker_release = Self::account(ledger, args.taker_release_account, "taker release")?;
        Self::require_mint(taker_release, record.counter_mint, "taker release")?;
        Self::require_owner(taker_release, args.taker, "taker release")?;

        let taker_receive = Self::account(ledger, args.taker_receive_account, "taker receive")?;
        Self::require_mint(taker_receive, record.deposit_mint, "taker receive")?;

        Ok(record.clone())
    }

    /// Validate a Cancel request and return the record it targets.
    ///
    /// # Errors
    /// - `RecordClosed` / `InvalidAccount` if the record isn't active
    /// - `Unauthorized` if the signer isn't the record's initializer
    /// - `InvalidAccount` for a vault or release account not on the record
    pub fn check_cancel(
        signer: &Signer,
        args: &CancelArgs,
        registry: &EscrowRegistry,
    ) -> Result<EscrowRecord> {
        let record = registry.resolve(&args.record)?;
        Self::require_signer(signer, record.initializer, "initializer")?;
        if args.initializer != record.initializer {
            return Err(OpenescrowError::Unauthorized {
                reason: format!("{} is not the initializer of {}", args.initializer, record.id),
            });
        }

        if args.vault != record.vault {
            return Err(OpenescrowError::InvalidAccount {
                reason: format!("vault {} does not belong to {}", args.vault, record.id),
            });
        }
        if args.release_account != record.release_account {
            return Err(OpenescrowError::InvalidAccount {
                reason: format!(
                    "release account {} does not match {}",
                    args.release_account, record.release_account
                ),
            });
        }
        Ok(record.clone())
    }

    fn require_signer(signer: &Signer, expected: PartyId, role: &str) -> Result<()> {
        if signer.party() != expected {
            return Err(OpenescrowError::Unauthorized {
                reason: format!("signer {} is not the {role} {expected}", signer.party()),
            });
        }
        Ok(())
    }

    fn account<'l>(
        ledger: &'l TokenLedger,
        id: TokenAccountId,
        role: &str,
    ) -> Result<&'l TokenAccount> {
        ledger
            .account(&id)
            .ok_or_else(|| OpenescrowError::InvalidAccount {
                reason: format!("{role} account {id} does not exist"),
            })
    }

    fn require_mint(account: &TokenAccount, mint: MintId, role: &str) -> Result<()> {
        if account.mint != mint {
            return Err(OpenescrowError::InvalidAccount {
                reason: format!(
                    "{role} account {} holds {}, expected {mint}",
                    account.id, account.mint
                ),
            });
        }
        Ok(())
    }

    fn require_owner(account: &TokenAccount, party: PartyId, role: &str) -> Result<()> {
        if !account.is_owned_by(Owner::Party(party)) {
            return Err(OpenescrowError::Unauthorized {
                reason: format!("{role} account {} is not owned by {party}", account.id),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openescrow_types::{RecordId, VaultId, random_signing_key};

    struct Fixture {
        ledger: TokenLedger,
        registry: EscrowRegistry,
        signer: Signer,
        args: InitializeArgs,
    }

    fn fixture() -> Fixture {
        let signer = Signer::from_signing_key(&random_signing_key());
        let party = signer.party();
        let mint_a = MintId::from_label("A");
        let mint_b = MintId::from_label("B");
        let mut ledger = TokenLedger::new();
        let release = ledger.create_account(mint_a, Owner::Party(party));
        let receive = ledger.create_account(mint_b, Owner::Party(party));
        Fixture {
            ledger,
            registry: EscrowRegistry::new(16),
            signer,
            args: InitializeArgs {
                initializer: party,
                deposit_mint: mint_a,
                counter_mint: mint_b,
                deposit_amount: 500,
                counter_amount: 1000,
                release_account: release,
                receive_account: receive,
            },
        }
    }

    #[test]
    fn initialize_accepts_consistent_request() {
        let f = fixture();
        AuthorizationGuard::check_initialize(&f.signer, &f.args, &f.ledger, &f.registry).unwrap();
    }

    #[test]
    fn initialize_wrong_signer_unauthorized() {
        let f = fixture();
        let stranger = Signer::from_signing_key(&random_signing_key());
        let err = AuthorizationGuard::check_initialize(&stranger, &f.args, &f.ledger, &f.registry)
            .unwrap_err();
        assert!(matches!(err, OpenescrowError::Unauthorized { .. }));
    }

    #[test]
    fn initialize_release_wrong_mint() {
        let mut f = fixture();
        f.args.release_account = f.args.receive_account;
        let err = AuthorizationGuard::check_initialize(&f.signer, &f.args, &f.ledger, &f.registry)
            .unwrap_err();
        assert!(matches!(err, OpenescrowError::InvalidAccount { .. }));
    }

    #[test]
    fn initialize_release_owned_by_someone_else() {
        let mut f = fixture();
        let foreign = f
            .ledger
            .create_account(f.args.deposit_mint, Owner::Party(PartyId([7u8; 32])));
        f.args.release_account = foreign;
        let err = AuthorizationGuard::check_initialize(&f.signer, &f.args, &f.ledger, &f.registry)
            .unwrap_err();
        assert!(matches!(err, OpenescrowError::Unauthorized { .. }));
    }

    #[test]
    fn initialize_same_mints_rejected() {
        let mut f = fixture();
        f.args.counter_mint = f.args.deposit_mint;
        let err = AuthorizationGuard::check_initialize(&f.signer, &f.args, &f.ledger, &f.registry)
            .unwrap_err();
        assert!(matches!(err, OpenescrowError::InvalidAccount { .. }));
    }

    #[test]
    fn initialize_missing_account() {
        let mut f = fixture();
        f.args.receive_account = TokenAccountId::new();
        let err = AuthorizationGuard::check_initialize(&f.signer, &f.args, &f.ledger, &f.registry)
            .unwrap_err();
        assert!(matches!(err, OpenescrowError::InvalidAccount { .. }));
    }

    #[test]
    fn initialize_occupied_scope() {
        let mut f = fixture();
        f.registry.create(&f.args, VaultId([1u8; 32])).unwrap();
        let err = AuthorizationGuard::check_initialize(&f.signer, &f.args, &f.ledger, &f.registry)
            .unwrap_err();
        assert!(matches!(err, OpenescrowError::AlreadyExists(_)));
    }

    #[test]
    fn exchange_checks_record_references() {
        let mut f = fixture();
        let record = f.registry.create(&f.args, VaultId([1u8; 32])).unwrap();
        let taker = Signer::from_signing_key(&random_signing_key());
        let taker_b = f
            .ledger
            .create_account(record.counter_mint, Owner::Party(taker.party()));
        let taker_a = f
            .ledger
            .create_account(record.deposit_mint, Owner::Party(taker.party()));
        let args = ExchangeArgs {
            taker: taker.party(),
            record: record.id,
            vault: record.vault,
            offered_amount: 1000,
            taker_release_account: taker_b,
            taker_receive_account: taker_a,
            initializer_receive_account: record.receive_account,
        };
        assert_eq!(
            AuthorizationGuard::check_exchange(&taker, &args, &f.ledger, &f.registry).unwrap(),
            record
        );

        let swapped = ExchangeArgs {
            taker_release_account: taker_a,
            taker_receive_account: taker_b,
            ..args.clone()
        };
        assert!(matches!(
            AuthorizationGuard::check_exchange(&taker, &swapped, &f.ledger, &f.registry)
                .unwrap_err(),
            OpenescrowError::InvalidAccount { .. }
        ));

        let wrong_vault = ExchangeArgs {
            vault: VaultId([2u8; 32]),
            ..args.clone()
        };
        assert!(matches!(
            AuthorizationGuard::check_exchange(&taker, &wrong_vault, &f.ledger, &f.registry)
                .unwrap_err(),
            OpenescrowError::InvalidAccount { .. }
        ));

        let wrong_receive = ExchangeArgs {
            initializer_receive_account: taker_b,
            ..args.clone()
        };
        assert!(matches!(
            AuthorizationGuard::check_exchange(&taker, &wrong_receive, &f.ledger, &f.registry)
                .unwrap_err(),
            OpenescrowError::InvalidAccount { .. }
        ));

        // Signing as the taker while naming someone else's account.
        assert!(matches!(
            AuthorizationGuard::check_exchange(&f.signer, &args, &f.ledger, &f.registry)
                .unwrap_err(),
            OpenescrowError::Unauthorized { .. }
        ));
    }

    #[test]
    fn cancel_only_by_initializer() {
        let mut f = fixture();
        let record = f.registry.create(&f.args, VaultId([1u8; 32])).unwrap();
        let args = CancelArgs {
            initializer: record.initializer,
            record: record.id,
            vault: record.vault,
            release_account: record.release_account,
        };
        AuthorizationGuard::check_cancel(&f.signer, &args, &f.registry).unwrap();

        let stranger = Signer::from_signing_key(&random_signing_key());
        let forged = CancelArgs {
            initializer: stranger.party(),
            ..args.clone()
        };
        assert!(matches!(
            AuthorizationGuard::check_cancel(&stranger, &forged, &f.registry).unwrap_err(),
            OpenescrowError::Unauthorized { .. }
        ));

        let wrong_release = CancelArgs {
            release_account: record.receive_account,
            ..args
        };
        assert!(matches!(
            AuthorizationGuard::check_cancel(&f.signer, &wrong_release, &f.registry).unwrap_err(),
            OpenescrowError::InvalidAccount { .. }
        ));
    }

    #[test]
    fn unknown_record() {
        let f = fixture();
        let args = CancelArgs {
            initializer: f.signer.party(),
            record: RecordId::new(),
            vault: VaultId([1u8; 32]),
            release_account: f.args.release_account,
        };
        assert!(matches!(
            AuthorizationGuard::check_cancel(&f.signer, &args, &f.registry).unwrap_err(),
            OpenescrowError::InvalidAccount { .. }
        ));
    }
}
