// Copyright (c) 2024 The Lattice Project

//! Property-based invariants: conservation of supply, delegation
//! bookkeeping, chain-walk integrity, and process/rollback symmetry
//! under randomized operation sequences.

mod common;

use common::*;
use heed::RoTxn;
use lattice_blockchain_types::{Amount, Block, BlockHash, Link, StateBlock, CHAIN_TOKEN};
use lattice_crypto_keys::Ed25519Pair;
use lattice_ledger_db::{Ledger, ProcessResult};
use proptest::prelude::*;

/// Genesis plus a handful of user accounts, deterministic across runs.
fn pool() -> Vec<Ed25519Pair> {
    let mut pairs = vec![lattice_ledger_db::testnet_genesis_pair()];
    for seed in 101u8..=104 {
        pairs.push(test_pair(seed));
    }
    pairs
}

#[derive(Debug, Clone)]
struct Op {
    sender: usize,
    dest: usize,
    raw_amount: u16,
    claim: bool,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    (0usize..5, 0usize..5, 1u16.., any::<bool>()).prop_map(|(sender, dest, raw_amount, claim)| Op {
        sender,
        dest,
        raw_amount,
        claim,
    })
}

/// Apply an operation sequence as state sends (each optionally claimed),
/// returning every applied block hash in application order.
fn apply_ops(ledger: &Ledger, pairs: &[Ed25519Pair], ops: &[Op]) -> Vec<BlockHash> {
    let mut applied = Vec::new();
    for op in ops {
        if op.sender == op.dest {
            continue;
        }
        let sender = &pairs[op.sender];
        let dest = &pairs[op.dest];
        let sender_account = account_of(sender);
        let dest_account = account_of(dest);

        let (sender_balance, opened) = {
            let txn = ledger.store.read_txn().unwrap();
            let balance = ledger
                .account_balance(&txn, &sender_account, &CHAIN_TOKEN)
                .unwrap();
            let opened = !ledger
                .latest(&txn, &sender_account, &CHAIN_TOKEN)
                .unwrap()
                .is_zero();
            (balance, opened)
        };
        if !opened || sender_balance.is_zero() {
            continue;
        }
        let amount = Amount::new((op.raw_amount as u128 % sender_balance.raw()) + 1);

        let send = make_state(
            ledger,
            sender,
            sender_account,
            Amount::new(sender_balance.raw() - amount.raw()),
            Link::from(dest_account),
            CHAIN_TOKEN,
        );
        let result = process(ledger, &send);
        assert_eq!(result.code, ProcessResult::Progress);
        assert!(result.state_is_send);
        applied.push(send.hash());

        if op.claim {
            let dest_balance = {
                let txn = ledger.store.read_txn().unwrap();
                ledger
                    .account_balance(&txn, &dest_account, &CHAIN_TOKEN)
                    .unwrap()
            };
            let receive = make_state(
                ledger,
                dest,
                dest_account,
                Amount::new(dest_balance.raw() + amount.raw()),
                Link::from(send.hash()),
                CHAIN_TOKEN,
            );
            let result = process(ledger, &receive);
            assert_eq!(result.code, ProcessResult::Progress);
            applied.push(receive.hash());
        }
    }
    applied
}

/// Native supply is conserved: balances plus unclaimed credits always
/// total the genesis amount.
fn check_conservation(ledger: &Ledger, txn: &RoTxn, pairs: &[Ed25519Pair]) {
    let mut total = Amount::ZERO;
    for (_, token, info) in ledger.store.accounts_list(txn).unwrap() {
        if token == CHAIN_TOKEN {
            total = total.saturating_add(info.balance);
        }
    }
    for pair in pairs {
        total = total.saturating_add(
            ledger
                .account_pending(txn, &account_of(pair), &CHAIN_TOKEN)
                .unwrap(),
        );
    }
    assert_eq!(total, Amount::MAX, "native supply drifted");
}

/// Every representation row equals the summed balances delegated to it.
fn check_representation(ledger: &Ledger, txn: &RoTxn, pairs: &[Ed25519Pair]) {
    for pair in pairs {
        let representative = account_of(pair);
        let mut expected = Amount::ZERO;
        for (_, _, info) in ledger.store.accounts_list(txn).unwrap() {
            let rep_block = ledger.store.block_get(txn, &info.rep_block).unwrap().unwrap();
            if rep_block.representative() == representative {
                expected = expected.saturating_add(info.balance);
            }
        }
        assert_eq!(
            ledger.store.representation_get(txn, &representative).unwrap(),
            expected,
            "representation row out of sync"
        );
    }
}

/// `head -> previous*` reaches the open block in exactly `block_count`
/// steps for every account row.
fn check_chain_walks(ledger: &Ledger, txn: &RoTxn) {
    for (_, _, info) in ledger.store.accounts_list(txn).unwrap() {
        let mut cursor = info.head;
        let mut steps = 0u64;
        let mut last = cursor;
        while !cursor.is_zero() {
            let block = ledger.store.block_get(txn, &cursor).unwrap().unwrap();
            steps += 1;
            last = cursor;
            cursor = block.previous();
            // The genesis open claims its own account as source; its
            // previous is zero like any open.
            assert!(steps <= info.block_count, "chain longer than block_count");
        }
        assert_eq!(steps, info.block_count);
        assert_eq!(last, info.open_block);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn prop_invariants_hold_under_random_sequences(
        ops in proptest::collection::vec(op_strategy(), 1..10)
    ) {
        let Fixture { _dir, ledger, genesis: _ } = fixture();
        let pairs = pool();
        apply_ops(&ledger, &pairs, &ops);

        let txn = ledger.store.read_txn().unwrap();
        check_conservation(&ledger, &txn, &pairs);
        check_representation(&ledger, &txn, &pairs);
        check_chain_walks(&ledger, &txn);
    }

    #[test]
    fn prop_rollback_in_reverse_restores_genesis(
        ops in proptest::collection::vec(op_strategy(), 1..10)
    ) {
        let Fixture { _dir, ledger, genesis: _ } = fixture();
        let pairs = pool();
        let (genesis_snapshot, genesis_checksum) = {
            let txn = ledger.store.read_txn().unwrap();
            (
                ledger.store.snapshot(&txn).unwrap(),
                ledger.checksum(&txn).unwrap(),
            )
        };

        let applied = apply_ops(&ledger, &pairs, &ops);
        for hash in applied.iter().rev() {
            let exists = {
                let txn = ledger.store.read_txn().unwrap();
                ledger.store.block_exists(&txn, hash).unwrap()
            };
            if exists {
                rollback(&ledger, hash);
            }
        }

        let txn = ledger.store.read_txn().unwrap();
        prop_assert_eq!(ledger.store.snapshot(&txn).unwrap(), genesis_snapshot);
        prop_assert_eq!(ledger.checksum(&txn).unwrap(), genesis_checksum);
    }

    #[test]
    fn prop_rollback_in_forward_order_cascades_to_genesis(
        ops in proptest::collection::vec(op_strategy(), 1..10)
    ) {
        let Fixture { _dir, ledger, genesis: _ } = fixture();
        let pairs = pool();
        let genesis_snapshot = {
            let txn = ledger.store.read_txn().unwrap();
            ledger.store.snapshot(&txn).unwrap()
        };

        // Rolling back the oldest block first forces the cascade paths.
        let applied = apply_ops(&ledger, &pairs, &ops);
        for hash in applied.iter() {
            let exists = {
                let txn = ledger.store.read_txn().unwrap();
                ledger.store.block_exists(&txn, hash).unwrap()
            };
            if exists {
                rollback(&ledger, hash);
            }
        }

        let txn = ledger.store.read_txn().unwrap();
        prop_assert_eq!(ledger.store.snapshot(&txn).unwrap(), genesis_snapshot);
    }
}

#[test]
fn process_then_rollback_single_block_is_identity() {
    let Fixture { _dir, ledger, genesis } = fixture();
    let before = {
        let txn = ledger.store.read_txn().unwrap();
        ledger.store.snapshot(&txn).unwrap()
    };
    let send = make_state(
        &ledger,
        &genesis,
        account_of(&genesis),
        Amount::new(u128::MAX - 1),
        Link::from(account_of(&test_pair(11))),
        CHAIN_TOKEN,
    );
    assert_eq!(process(&ledger, &send).code, ProcessResult::Progress);
    rollback(&ledger, &send.hash());
    let txn = ledger.store.read_txn().unwrap();
    assert_eq!(ledger.store.snapshot(&txn).unwrap(), before);
}

#[test]
fn rejected_blocks_leave_no_trace() {
    let Fixture { _dir, ledger, genesis } = fixture();

    let send = make_state(
        &ledger,
        &genesis,
        account_of(&genesis),
        Amount::new(u128::MAX - 10),
        Link::from(account_of(&test_pair(11))),
        CHAIN_TOKEN,
    );
    assert_eq!(process(&ledger, &send).code, ProcessResult::Progress);
    let before = {
        let txn = ledger.store.read_txn().unwrap();
        ledger.store.snapshot(&txn).unwrap()
    };

    // A fork, a bad signature and an unreceivable claim in sequence.
    // Claiming previous == 0 for an already-opened account is a fork.
    let genesis_account = account_of(&genesis);
    let fork = Block::State(StateBlock::new(
        genesis_account,
        BlockHash::ZERO,
        genesis_account,
        Amount::new(u128::MAX - 10),
        Link::from(send.hash()),
        CHAIN_TOKEN,
        &genesis,
        work_for(&BlockHash(genesis_account.0)),
    ));
    assert_eq!(process(&ledger, &fork).code, ProcessResult::Fork);

    // Correct account, wrong signing key.
    let wrong_key = test_pair(66);
    let forged = Block::State(StateBlock::new(
        genesis_account,
        send.hash(),
        genesis_account,
        Amount::new(1),
        Link::ZERO,
        CHAIN_TOKEN,
        &wrong_key,
        work_for(&send.hash()),
    ));
    assert_eq!(process(&ledger, &forged).code, ProcessResult::BadSignature);

    let unreceivable = make_state(
        &ledger,
        &test_pair(67),
        account_of(&genesis),
        Amount::new(7),
        Link::from(send.hash()),
        CHAIN_TOKEN,
    );
    assert_eq!(
        process(&ledger, &unreceivable).code,
        ProcessResult::Unreceivable
    );

    let txn = ledger.store.read_txn().unwrap();
    assert_eq!(ledger.store.snapshot(&txn).unwrap(), before);
}
