//! Randomized property tests: conservation of funds and rate invariance.
//!
//! Each case opens an offer with random terms and drives it through a
//! random sequence of partial fills, optionally finishing with a cancel.
//! Runs are seeded so failures reproduce.

use openescrow_ledger::TokenLedger;
use openescrow_settlement::{EscrowProgram, SwapEngine};
use openescrow_types::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

const CASES: u64 = 200;

struct Case {
    ledger: TokenLedger,
    program: EscrowProgram,
    initializer: Signer,
    taker: Signer,
    record: EscrowRecord,
    taker_release: TokenAccountId,
    taker_receive: TokenAccountId,
}

fn open_case(deposit: u64, counter: u64) -> Case {
    let initializer = Signer::from_signing_key(&random_signing_key());
    let taker = Signer::from_signing_key(&random_signing_key());
    let mint_a = MintId::from_label("A");
    let mint_b = MintId::from_label("B");

    let mut ledger = TokenLedger::new();
    let release = ledger.create_account(mint_a, Owner::Party(initializer.party()));
    let receive = ledger.create_account(mint_b, Owner::Party(initializer.party()));
    let taker_release = ledger.create_account(mint_b, Owner::Party(taker.party()));
    let taker_receive = ledger.create_account(mint_a, Owner::Party(taker.party()));
    ledger.mint_to(release, deposit).unwrap();
    // Enough to pay for the whole offer several times over.
    ledger.mint_to(taker_release, counter * 4).unwrap();

    let mut program = EscrowProgram::new(EscrowConfig::default()).unwrap();
    let record = program
        .initialize(
            &mut ledger,
            &initializer,
            InitializeArgs {
                initializer: initializer.party(),
                deposit_mint: mint_a,
                counter_mint: mint_b,
                deposit_amount: deposit,
                counter_amount: counter,
                release_account: release,
                receive_account: receive,
            },
        )
        .unwrap();

    Case {
        ledger,
        program,
        initializer,
        taker,
        record,
        taker_release,
        taker_receive,
    }
}

#[test]
fn released_plus_vault_equals_deposit() {
    let mut rng = StdRng::seed_from_u64(0x0e5c_0001);

    for _ in 0..CASES {
        let deposit = rng.gen_range(1..=10_000u64);
        let counter = rng.gen_range(1..=10_000u64);
        let mut case = open_case(deposit, counter);
        let record = case.record.clone();
        let vault_account = record.vault.token_account();
        let mut released_total = 0u64;

        for _ in 0..rng.gen_range(1..=8) {
            let offered = rng.gen_range(1..=counter);
            let before = case.ledger.balance(&vault_account);
            let outcome = case.program.exchange(
                &mut case.ledger,
                &case.taker,
                ExchangeArgs {
                    taker: case.taker.party(),
                    record: record.id,
                    vault: record.vault,
                    offered_amount: offered,
                    taker_release_account: case.taker_release,
                    taker_receive_account: case.taker_receive,
                    initializer_receive_account: record.receive_account,
                },
            );
            match outcome {
                Ok(result) => {
                    released_total += result.released;
                    assert_eq!(result.remaining, before - result.released);
                    assert_eq!(result.closed, result.remaining == 0);
                    if result.closed {
                        assert!(case.program.record(&record.id).is_none());
                        break;
                    }
                }
                Err(
                    OpenescrowError::InvalidAmount { .. }
                    | OpenescrowError::InsufficientFunds { .. },
                ) => {
                    // Rejected fills move nothing.
                    assert_eq!(case.ledger.balance(&vault_account), before);
                }
                Err(other) => panic!("unexpected error: {other}"),
            }

            let vault = case.ledger.balance(&vault_account);
            assert_eq!(released_total + vault, deposit);
            assert_eq!(case.program.record(&record.id).is_some(), vault > 0);
            case.ledger.verify_all_supply().unwrap();
        }

        if case.program.record(&record.id).is_some() {
            let refund = case
                .program
                .cancel(
                    &mut case.ledger,
                    &case.initializer,
                    CancelArgs {
                        initializer: record.initializer,
                        record: record.id,
                        vault: record.vault,
                        release_account: record.release_account,
                    },
                )
                .unwrap();
            released_total += refund.released;
        }

        assert_eq!(released_total, deposit);
        assert!(!case.ledger.contains(&vault_account));
        assert!(case.program.is_closed(&record.id));
        case.ledger.verify_all_supply().unwrap();
    }
}

#[test]
fn fills_track_the_original_rate() {
    let mut rng = StdRng::seed_from_u64(0x0e5c_0002);

    for _ in 0..CASES {
        let deposit = rng.gen_range(1..=1_000_000u64);
        let counter = rng.gen_range(1..=1_000_000u64);
        let record = EscrowRecord::dummy(deposit, counter);
        assert_eq!(
            record.rate(),
            Some(Decimal::from(deposit) / Decimal::from(counter))
        );
        let mut vault = deposit;

        for _ in 0..16 {
            let offered = rng.gen_range(1..=counter);
            let Ok(fill) = SwapEngine::quote(&record, vault, offered) else {
                continue;
            };

            // floor(offered * rate): never above the exact due, less than
            // one unit below it.
            let exact = Decimal::from(offered) * Decimal::from(deposit) / Decimal::from(counter);
            let released = Decimal::from(fill.released);
            assert!(released <= exact);
            assert!(exact - released < Decimal::ONE);

            vault = fill.remaining;
            if fill.closes() {
                break;
            }
        }
    }
}
