// Copyright (c) 2024 The Lattice Project

//! Shared fixtures for the ledger suites.
#![allow(dead_code)]

use lattice_blockchain_types::{
    work_generate, Account, Amount, Block, BlockHash, Link, OpenBlock, SendBlock, StateBlock,
    TokenType, TEST_WORK_THRESHOLD,
};
use lattice_crypto_keys::Ed25519Pair;
use lattice_ledger_db::{
    testnet_genesis_pair, Ledger, LedgerError, ProcessResult, ProcessReturn,
};
use tempfile::TempDir;

pub struct Fixture {
    // Held so the environment outlives the ledger.
    pub _dir: TempDir,
    pub ledger: Ledger,
    pub genesis: Ed25519Pair,
}

pub fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let ledger = Ledger::open(dir.path(), lattice_ledger_db::Network::Testnet).unwrap();
    Fixture {
        _dir: dir,
        ledger,
        genesis: testnet_genesis_pair(),
    }
}

pub fn work_for(root: &BlockHash) -> u64 {
    work_generate(root, TEST_WORK_THRESHOLD)
}

/// Process a block inside its own write transaction, committing only on
/// `Progress` the way node callers do.
pub fn process(ledger: &Ledger, block: &Block) -> ProcessReturn {
    try_process(ledger, block).unwrap()
}

pub fn try_process(ledger: &Ledger, block: &Block) -> Result<ProcessReturn, LedgerError> {
    let mut txn = ledger.store.write_txn()?;
    let result = ledger.process(&mut txn, block)?;
    if result.code == ProcessResult::Progress {
        txn.commit()?;
    }
    Ok(result)
}

pub fn rollback(ledger: &Ledger, hash: &BlockHash) {
    let mut txn = ledger.store.write_txn().unwrap();
    ledger.rollback(&mut txn, hash).unwrap();
    txn.commit().unwrap();
}

/// A signed legacy send lowering the sender's chain to `balance`.
pub fn make_send(
    ledger: &Ledger,
    sender: &Ed25519Pair,
    destination: Account,
    balance: Amount,
) -> Block {
    let txn = ledger.store.read_txn().unwrap();
    let previous = ledger
        .latest(&txn, &Account::from(sender.public_key()), &lattice_blockchain_types::CHAIN_TOKEN)
        .unwrap();
    drop(txn);
    Block::Send(SendBlock::new(
        previous,
        destination,
        balance,
        sender,
        work_for(&previous),
    ))
}

/// A signed legacy open claiming `source` for `owner`.
pub fn make_open(owner: &Ed25519Pair, representative: Account, source: BlockHash) -> Block {
    let account = Account::from(owner.public_key());
    Block::Open(OpenBlock::new(
        source,
        representative,
        account,
        owner,
        work_for(&BlockHash(account.0)),
    ))
}

/// A signed state block for `owner` with explicit fields.
pub fn make_state(
    ledger: &Ledger,
    owner: &Ed25519Pair,
    representative: Account,
    balance: Amount,
    link: Link,
    token: TokenType,
) -> Block {
    let account = Account::from(owner.public_key());
    let txn = ledger.store.read_txn().unwrap();
    let previous = ledger.latest(&txn, &account, &token).unwrap();
    drop(txn);
    let root = if previous.is_zero() {
        BlockHash(account.0)
    } else {
        previous
    };
    Block::State(StateBlock::new(
        account,
        previous,
        representative,
        balance,
        link,
        token,
        owner,
        work_for(&root),
    ))
}

pub fn account_of(pair: &Ed25519Pair) -> Account {
    Account::from(pair.public_key())
}

pub fn test_pair(seed: u8) -> Ed25519Pair {
    Ed25519Pair::from_seed(&[seed; 32])
}
