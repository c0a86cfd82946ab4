// Copyright (c) 2024 The Lattice Project

//! Exact inverses of the processor, one per block variant.
//!
//! Each routine undoes the head block of an account chain: restore the
//! predecessor balance and delegation, resurrect or remove the pending
//! credit, rewind the head row, and put the frontier back. Undoing a
//! send whose credit was already claimed first unwinds the claimant's
//! chain until the credit reappears.

use heed::RwTxn;
use lattice_blockchain_types::{
    Account, Amount, Block, BlockHash, BlockType, ChangeBlock, OpenBlock, ReceiveBlock, SendBlock,
    SmartContractBlock, StateBlock, TokenType, CHAIN_TOKEN,
};
use tracing::debug;

use crate::ledger::Ledger;
use crate::store::{PendingInfo, PendingKey};
use crate::LedgerError;

pub(crate) fn rollback_one(
    ledger: &Ledger,
    txn: &mut RwTxn,
    account: &Account,
    token: &TokenType,
    block: &Block,
) -> Result<(), LedgerError> {
    match block {
        Block::Send(inner) => rollback_send(ledger, txn, account, inner),
        Block::Receive(inner) => rollback_receive(ledger, txn, account, inner),
        Block::Open(inner) => rollback_open(ledger, txn, account, inner),
        Block::Change(inner) => rollback_change(ledger, txn, account, inner),
        Block::State(inner) => rollback_state(ledger, txn, account, token, inner),
        Block::SmartContract(inner) => rollback_smart_contract(ledger, txn, inner),
    }
}

fn rollback_send(
    ledger: &Ledger,
    txn: &mut RwTxn,
    account: &Account,
    send: &SendBlock,
) -> Result<(), LedgerError> {
    let hash = send.hash();
    let destination = send.hashables.destination;
    let key = PendingKey::new(destination, hash);
    // If the credit was already claimed, unwind the claimant until it
    // reappears.
    while !ledger.store.pending_exists(txn, &key)? {
        let latest = ledger.latest(txn, &destination, &CHAIN_TOKEN)?;
        ledger.rollback(txn, &latest)?;
    }
    let pending = ledger
        .store
        .pending_get(txn, &key)?
        .ok_or(LedgerError::Corrupt("pending vanished during rollback"))?;
    let info = ledger
        .store
        .accounts_get(txn, account, &CHAIN_TOKEN)?
        .ok_or(LedgerError::AccountNotFound)?;
    ledger.store.pending_del(txn, &key)?;
    let rep_block = ledger.representative(txn, &hash)?;
    ledger
        .store
        .representation_add(txn, &rep_block, pending.amount)?;
    let balance = ledger.balance(txn, &send.hashables.previous)?;
    ledger.change_latest(
        txn,
        account,
        &CHAIN_TOKEN,
        send.hashables.previous,
        info.rep_block,
        balance,
        info.block_count - 1,
        false,
    )?;
    ledger.store.block_del(txn, &hash)?;
    ledger.store.frontier_del(txn, &hash)?;
    ledger
        .store
        .frontier_put(txn, &send.hashables.previous, account)?;
    ledger
        .store
        .block_successor_clear(txn, &send.hashables.previous)?;
    if info.block_count % ledger.constants.block_info_max == 0 {
        ledger.store.block_info_del(txn, &hash)?;
    }
    debug!(block = %hash, %account, "rolled back send");
    Ok(())
}

fn rollback_receive(
    ledger: &Ledger,
    txn: &mut RwTxn,
    account: &Account,
    receive: &ReceiveBlock,
) -> Result<(), LedgerError> {
    let hash = receive.hash();
    let amount = ledger.amount(txn, &receive.hashables.source)?;
    let source_account = ledger.account(txn, &receive.hashables.source)?;
    let info = ledger
        .store
        .accounts_get(txn, account, &CHAIN_TOKEN)?
        .ok_or(LedgerError::AccountNotFound)?;
    let rep_block = ledger.representative(txn, &hash)?;
    ledger.store.representation_sub(txn, &rep_block, amount)?;
    let previous_rep = ledger.representative(txn, &receive.hashables.previous)?;
    let balance = ledger.balance(txn, &receive.hashables.previous)?;
    ledger.change_latest(
        txn,
        account,
        &CHAIN_TOKEN,
        receive.hashables.previous,
        previous_rep,
        balance,
        info.block_count - 1,
        false,
    )?;
    ledger.store.block_del(txn, &hash)?;
    ledger.store.pending_put(
        txn,
        &PendingKey::new(*account, receive.hashables.source),
        &PendingInfo {
            source: source_account,
            amount,
            token_type: CHAIN_TOKEN,
        },
    )?;
    ledger.store.frontier_del(txn, &hash)?;
    ledger
        .store
        .frontier_put(txn, &receive.hashables.previous, account)?;
    ledger
        .store
        .block_successor_clear(txn, &receive.hashables.previous)?;
    if info.block_count % ledger.constants.block_info_max == 0 {
        ledger.store.block_info_del(txn, &hash)?;
    }
    debug!(block = %hash, %account, "rolled back receive");
    Ok(())
}

fn rollback_open(
    ledger: &Ledger,
    txn: &mut RwTxn,
    account: &Account,
    open: &OpenBlock,
) -> Result<(), LedgerError> {
    let hash = open.hash();
    let amount = ledger.amount(txn, &open.hashables.source)?;
    let source_account = ledger.account(txn, &open.hashables.source)?;
    let rep_block = ledger.representative(txn, &hash)?;
    ledger.store.representation_sub(txn, &rep_block, amount)?;
    // Rewinding past the open removes the account row entirely.
    ledger.change_latest(
        txn,
        account,
        &CHAIN_TOKEN,
        BlockHash::ZERO,
        BlockHash::ZERO,
        Amount::ZERO,
        0,
        false,
    )?;
    ledger.store.block_del(txn, &hash)?;
    ledger.store.pending_put(
        txn,
        &PendingKey::new(*account, open.hashables.source),
        &PendingInfo {
            source: source_account,
            amount,
            token_type: CHAIN_TOKEN,
        },
    )?;
    ledger.store.frontier_del(txn, &hash)?;
    debug!(block = %hash, %account, "rolled back open");
    Ok(())
}

fn rollback_change(
    ledger: &Ledger,
    txn: &mut RwTxn,
    account: &Account,
    change: &ChangeBlock,
) -> Result<(), LedgerError> {
    let hash = change.hash();
    let previous_rep = ledger.representative(txn, &change.hashables.previous)?;
    let balance = ledger.balance(txn, &change.hashables.previous)?;
    let info = ledger
        .store
        .accounts_get(txn, account, &CHAIN_TOKEN)?
        .ok_or(LedgerError::AccountNotFound)?;
    ledger.store.representation_add(txn, &previous_rep, balance)?;
    ledger.store.representation_sub(txn, &hash, balance)?;
    ledger.store.block_del(txn, &hash)?;
    ledger.change_latest(
        txn,
        account,
        &CHAIN_TOKEN,
        change.hashables.previous,
        previous_rep,
        info.balance,
        info.block_count - 1,
        false,
    )?;
    ledger.store.frontier_del(txn, &hash)?;
    ledger
        .store
        .frontier_put(txn, &change.hashables.previous, account)?;
    ledger
        .store
        .block_successor_clear(txn, &change.hashables.previous)?;
    if info.block_count % ledger.constants.block_info_max == 0 {
        ledger.store.block_info_del(txn, &hash)?;
    }
    debug!(block = %hash, %account, "rolled back change");
    Ok(())
}

fn rollback_state(
    ledger: &Ledger,
    txn: &mut RwTxn,
    account: &Account,
    token: &TokenType,
    state: &StateBlock,
) -> Result<(), LedgerError> {
    let hash = state.hash();
    let previous = state.hashables.previous;
    let previous_rep = if previous.is_zero() {
        BlockHash::ZERO
    } else {
        ledger.representative(txn, &previous)?
    };
    let previous_balance = ledger.balance(txn, &previous)?;
    let is_send = state.hashables.balance < previous_balance;

    ledger
        .store
        .representation_sub(txn, &hash, state.hashables.balance)?;
    if !previous_rep.is_zero() {
        ledger
            .store
            .representation_add(txn, &previous_rep, previous_balance)?;
    }

    if is_send {
        let key = PendingKey::new(state.hashables.link.as_account(), hash);
        while !ledger.store.pending_exists(txn, &key)? {
            let latest = ledger
                .latest(txn, &state.hashables.link.as_account(), token)?;
            ledger.rollback(txn, &latest)?;
        }
        ledger.store.pending_del(txn, &key)?;
    } else if !state.hashables.link.is_zero() {
        // Resurrect the credit this receive claimed.
        let source = state.hashables.link.as_block_hash();
        let source_account = ledger.account(txn, &source)?;
        let amount = state
            .hashables
            .balance
            .checked_sub(previous_balance)
            .ok_or(LedgerError::Corrupt("state receive below previous balance"))?;
        ledger.store.pending_put(
            txn,
            &PendingKey::new(*account, source),
            &PendingInfo {
                source: source_account,
                amount,
                token_type: *token,
            },
        )?;
    }

    let info = ledger
        .store
        .accounts_get(txn, account, token)?
        .ok_or(LedgerError::AccountNotFound)?;
    let previous_block = if previous.is_zero() {
        None
    } else {
        ledger.store.block_get(txn, &previous)?
    };
    ledger.change_latest(
        txn,
        account,
        token,
        previous,
        previous_rep,
        previous_balance,
        info.block_count.saturating_sub(1),
        matches!(previous_block.as_ref(), Some(Block::State(_))),
    )?;
    if let Some(previous_block) = &previous_block {
        ledger.store.block_successor_clear(txn, &previous)?;
        // A legacy predecessor becomes a frontier head again.
        if previous_block.block_type() != BlockType::State {
            ledger.store.frontier_put(txn, &previous, account)?;
        }
    }
    ledger.store.block_del(txn, &hash)?;
    debug!(block = %hash, %account, "rolled back state");
    Ok(())
}

/// Symmetric inverse of registration: the block and its ABI both leave
/// the ledger.
fn rollback_smart_contract(
    ledger: &Ledger,
    txn: &mut RwTxn,
    contract: &SmartContractBlock,
) -> Result<(), LedgerError> {
    let hash = contract.hash();
    ledger.store.abi_del(txn, &contract.hashables.abi_hash)?;
    ledger.store.block_del(txn, &hash)?;
    debug!(block = %hash, "rolled back smart contract");
    Ok(())
}
