// Copyright (c) 2024 The Lattice Project

//! The block processor.
//!
//! One validation ladder per block variant. Every rung either passes or
//! settles the verdict and returns; no table is touched until the final
//! rung, so a rejected block leaves the store byte-identical. The caller
//! owns the write transaction and decides whether to commit.

use heed::RwTxn;
use lattice_blockchain_types::{
    Account, Amount, Block, BlockHash, ChangeBlock, OpenBlock, ReceiveBlock, SendBlock,
    SmartContractBlock, StateBlock, CHAIN_TOKEN,
};
use lattice_crypto_keys::Ed25519Signature;
use tracing::debug;

use crate::ledger::Ledger;
use crate::store::{PendingInfo, PendingKey};
use crate::LedgerError;

/// Verdict of processing one block.
///
/// `Old` and the `Gap*` codes are harmless: the caller should buffer the
/// block and retry once the missing piece arrives. `Fork` needs fork
/// resolution. The remaining non-`Progress` codes are permanent rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessResult {
    /// Applied and written.
    Progress,
    /// Signature does not verify over the block hash.
    BadSignature,
    /// Already in the ledger.
    Old,
    /// Another block already occupies the claimed position.
    Fork,
    /// A send tried to raise its balance.
    NegativeSpend,
    /// The predecessor is not in the ledger yet.
    GapPrevious,
    /// The claimed source block is not in the ledger yet.
    GapSource,
    /// The referenced token registration is not in the ledger yet.
    GapSmartContract,
    /// No matching pending credit exists.
    Unreceivable,
    /// A receive named a source that is not a send.
    NotReceiveFromSend,
    /// The signing account does not own the claimed position.
    AccountMismatch,
    /// The burn account can never be opened.
    OpenedBurnAccount,
    /// A state receive or change declared the wrong balance.
    BalanceMismatch,
    /// A legacy block cannot follow a predecessor of that type.
    BlockPosition,
    /// The declared ABI hash does not match the ABI bytes.
    AbiMismatch,
    /// A contract with this ABI hash is already registered.
    AbiAlreadyExist,
    /// A smart-contract block named a zero account.
    ScAccountMismatch,
}

/// Everything `process` reports back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessReturn {
    pub code: ProcessResult,
    pub account: Account,
    pub amount: Amount,
    pub pending_account: Account,
    pub state_is_send: bool,
}

impl ProcessReturn {
    fn with_code(code: ProcessResult) -> Self {
        Self {
            code,
            account: Account::ZERO,
            amount: Amount::ZERO,
            pending_account: Account::ZERO,
            state_is_send: false,
        }
    }
}

/// Ed25519 verification of `signature` over `hash` with the account key.
/// Accounts that are not curve points can never verify.
fn validate_message(account: &Account, hash: &BlockHash, signature: &Ed25519Signature) -> bool {
    match account.to_public() {
        Ok(key) => key.verify(hash.as_bytes(), signature).is_ok(),
        Err(_) => false,
    }
}

pub(crate) fn process(
    ledger: &Ledger,
    txn: &mut RwTxn,
    block: &Block,
) -> Result<ProcessReturn, LedgerError> {
    match block {
        Block::Send(inner) => process_send(ledger, txn, block, inner),
        Block::Receive(inner) => process_receive(ledger, txn, block, inner),
        Block::Open(inner) => process_open(ledger, txn, block, inner),
        Block::Change(inner) => process_change(ledger, txn, block, inner),
        Block::State(inner) => process_state(ledger, txn, block, inner),
        Block::SmartContract(inner) => process_smart_contract(ledger, txn, block, inner),
    }
}

fn process_send(
    ledger: &Ledger,
    txn: &mut RwTxn,
    block: &Block,
    send: &SendBlock,
) -> Result<ProcessReturn, LedgerError> {
    let hash = send.hash();
    if ledger.store.block_exists(txn, &hash)? {
        return Ok(ProcessReturn::with_code(ProcessResult::Old));
    }
    let Some(previous) = ledger.store.block_get(txn, &send.hashables.previous)? else {
        return Ok(ProcessReturn::with_code(ProcessResult::GapPrevious));
    };
    if !block.valid_predecessor(previous.block_type()) {
        return Ok(ProcessReturn::with_code(ProcessResult::BlockPosition));
    }
    // Previous exists but is not a head: a signed fork.
    let Some(account) = ledger.store.frontier_get(txn, &send.hashables.previous)? else {
        return Ok(ProcessReturn::with_code(ProcessResult::Fork));
    };
    if !validate_message(&account, &hash, &send.signature) {
        return Ok(ProcessReturn::with_code(ProcessResult::BadSignature));
    }
    let info = ledger
        .store
        .accounts_get(txn, &account, &CHAIN_TOKEN)?
        .ok_or(LedgerError::Corrupt("frontier head without account row"))?;
    debug_assert_eq!(info.head, send.hashables.previous);
    let Some(amount) = info.balance.checked_sub(send.hashables.balance) else {
        return Ok(ProcessReturn::with_code(ProcessResult::NegativeSpend));
    };

    ledger.store.representation_sub(txn, &info.rep_block, amount)?;
    ledger.store.block_put(txn, &hash, block)?;
    ledger.change_latest(
        txn,
        &account,
        &CHAIN_TOKEN,
        hash,
        info.rep_block,
        send.hashables.balance,
        info.block_count + 1,
        false,
    )?;
    ledger.store.pending_put(
        txn,
        &PendingKey::new(send.hashables.destination, hash),
        &PendingInfo {
            source: account,
            amount,
            token_type: CHAIN_TOKEN,
        },
    )?;
    ledger.store.frontier_del(txn, &send.hashables.previous)?;
    ledger.store.frontier_put(txn, &hash, &account)?;
    debug!(block = %hash, %account, amount = %amount, "applied send");
    Ok(ProcessReturn {
        code: ProcessResult::Progress,
        account,
        amount,
        pending_account: send.hashables.destination,
        state_is_send: false,
    })
}

fn process_receive(
    ledger: &Ledger,
    txn: &mut RwTxn,
    block: &Block,
    receive: &ReceiveBlock,
) -> Result<ProcessReturn, LedgerError> {
    let hash = receive.hash();
    if ledger.store.block_exists(txn, &hash)? {
        return Ok(ProcessReturn::with_code(ProcessResult::Old));
    }
    let Some(previous) = ledger.store.block_get(txn, &receive.hashables.previous)? else {
        return Ok(ProcessReturn::with_code(ProcessResult::GapPrevious));
    };
    if !block.valid_predecessor(previous.block_type()) {
        return Ok(ProcessReturn::with_code(ProcessResult::BlockPosition));
    }
    if !ledger.store.block_exists(txn, &receive.hashables.source)? {
        return Ok(ProcessReturn::with_code(ProcessResult::GapSource));
    }
    // Previous exists but is not a head: a signed fork.
    let Some(account) = ledger.store.frontier_get(txn, &receive.hashables.previous)? else {
        return Ok(ProcessReturn::with_code(ProcessResult::Fork));
    };
    if !validate_message(&account, &hash, &receive.signature) {
        return Ok(ProcessReturn::with_code(ProcessResult::BadSignature));
    }
    let info = ledger
        .store
        .accounts_get(txn, &account, &CHAIN_TOKEN)?
        .ok_or(LedgerError::Corrupt("frontier head without account row"))?;
    if info.head != receive.hashables.previous {
        return Ok(ProcessReturn::with_code(ProcessResult::GapPrevious));
    }
    let key = PendingKey::new(account, receive.hashables.source);
    let Some(pending) = ledger.store.pending_get(txn, &key)? else {
        return Ok(ProcessReturn::with_code(ProcessResult::Unreceivable));
    };

    let new_balance = info.balance.saturating_add(pending.amount);
    ledger.store.pending_del(txn, &key)?;
    ledger.store.block_put(txn, &hash, block)?;
    ledger.change_latest(
        txn,
        &account,
        &CHAIN_TOKEN,
        hash,
        info.rep_block,
        new_balance,
        info.block_count + 1,
        false,
    )?;
    ledger
        .store
        .representation_add(txn, &info.rep_block, pending.amount)?;
    ledger.store.frontier_del(txn, &receive.hashables.previous)?;
    ledger.store.frontier_put(txn, &hash, &account)?;
    debug!(block = %hash, %account, amount = %pending.amount, "applied receive");
    Ok(ProcessReturn {
        code: ProcessResult::Progress,
        account,
        amount: pending.amount,
        pending_account: Account::ZERO,
        state_is_send: false,
    })
}

fn process_open(
    ledger: &Ledger,
    txn: &mut RwTxn,
    block: &Block,
    open: &OpenBlock,
) -> Result<ProcessReturn, LedgerError> {
    let hash = open.hash();
    if ledger.store.block_exists(txn, &hash)? {
        return Ok(ProcessReturn::with_code(ProcessResult::Old));
    }
    if !ledger.store.block_exists(txn, &open.hashables.source)? {
        return Ok(ProcessReturn::with_code(ProcessResult::GapSource));
    }
    if !validate_message(&open.hashables.account, &hash, &open.signature) {
        return Ok(ProcessReturn::with_code(ProcessResult::BadSignature));
    }
    if ledger
        .store
        .accounts_get(txn, &open.hashables.account, &CHAIN_TOKEN)?
        .is_some()
    {
        return Ok(ProcessReturn::with_code(ProcessResult::Fork));
    }
    let key = PendingKey::new(open.hashables.account, open.hashables.source);
    let Some(pending) = ledger.store.pending_get(txn, &key)? else {
        return Ok(ProcessReturn::with_code(ProcessResult::Unreceivable));
    };
    if open.hashables.account.is_zero() {
        return Ok(ProcessReturn::with_code(ProcessResult::OpenedBurnAccount));
    }

    ledger.store.pending_del(txn, &key)?;
    ledger.store.block_put(txn, &hash, block)?;
    ledger.change_latest(
        txn,
        &open.hashables.account,
        &CHAIN_TOKEN,
        hash,
        hash,
        pending.amount,
        1,
        false,
    )?;
    ledger.store.representation_add(txn, &hash, pending.amount)?;
    ledger
        .store
        .frontier_put(txn, &hash, &open.hashables.account)?;
    debug!(block = %hash, account = %open.hashables.account, amount = %pending.amount, "applied open");
    Ok(ProcessReturn {
        code: ProcessResult::Progress,
        account: open.hashables.account,
        amount: pending.amount,
        pending_account: Account::ZERO,
        state_is_send: false,
    })
}

fn process_change(
    ledger: &Ledger,
    txn: &mut RwTxn,
    block: &Block,
    change: &ChangeBlock,
) -> Result<ProcessReturn, LedgerError> {
    let hash = change.hash();
    if ledger.store.block_exists(txn, &hash)? {
        return Ok(ProcessReturn::with_code(ProcessResult::Old));
    }
    let Some(previous) = ledger.store.block_get(txn, &change.hashables.previous)? else {
        return Ok(ProcessReturn::with_code(ProcessResult::GapPrevious));
    };
    if !block.valid_predecessor(previous.block_type()) {
        return Ok(ProcessReturn::with_code(ProcessResult::BlockPosition));
    }
    let Some(account) = ledger.store.frontier_get(txn, &change.hashables.previous)? else {
        return Ok(ProcessReturn::with_code(ProcessResult::Fork));
    };
    if !validate_message(&account, &hash, &change.signature) {
        return Ok(ProcessReturn::with_code(ProcessResult::BadSignature));
    }
    let info = ledger
        .store
        .accounts_get(txn, &account, &CHAIN_TOKEN)?
        .ok_or(LedgerError::Corrupt("frontier head without account row"))?;
    debug_assert_eq!(info.head, change.hashables.previous);

    ledger.store.block_put(txn, &hash, block)?;
    let balance = ledger.balance(txn, &change.hashables.previous)?;
    ledger.store.representation_add(txn, &hash, balance)?;
    ledger.store.representation_sub(txn, &info.rep_block, balance)?;
    ledger.change_latest(
        txn,
        &account,
        &CHAIN_TOKEN,
        hash,
        hash,
        info.balance,
        info.block_count + 1,
        false,
    )?;
    ledger.store.frontier_del(txn, &change.hashables.previous)?;
    ledger.store.frontier_put(txn, &hash, &account)?;
    debug!(block = %hash, %account, "applied change");
    Ok(ProcessReturn {
        code: ProcessResult::Progress,
        account,
        amount: Amount::ZERO,
        pending_account: Account::ZERO,
        state_is_send: false,
    })
}

fn process_state(
    ledger: &Ledger,
    txn: &mut RwTxn,
    block: &Block,
    state: &StateBlock,
) -> Result<ProcessReturn, LedgerError> {
    let hash = state.hash();
    if ledger.store.block_exists(txn, &hash)? {
        return Ok(ProcessReturn::with_code(ProcessResult::Old));
    }
    if !validate_message(&state.hashables.account, &hash, &state.signature) {
        return Ok(ProcessReturn::with_code(ProcessResult::BadSignature));
    }
    if state.hashables.account.is_zero() {
        return Ok(ProcessReturn::with_code(ProcessResult::OpenedBurnAccount));
    }

    let token = state.hashables.token_hash;
    let existing = ledger
        .store
        .accounts_get(txn, &state.hashables.account, &token)?;
    let mut is_send = false;
    let amount;
    match &existing {
        Some(info) => {
            // Account already has a chain for this token.
            if state.hashables.previous.is_zero() {
                return Ok(ProcessReturn::with_code(ProcessResult::Fork));
            }
            if !ledger.store.block_exists(txn, &state.hashables.previous)? {
                return Ok(ProcessReturn::with_code(ProcessResult::GapPrevious));
            }
            if !token.is_zero() && !ledger.store.block_exists(txn, &token)? {
                return Ok(ProcessReturn::with_code(ProcessResult::GapSmartContract));
            }
            is_send = state.hashables.balance < info.balance;
            amount = state.hashables.balance.abs_diff(info.balance);
            if state.hashables.previous != info.head {
                return Ok(ProcessReturn::with_code(ProcessResult::Fork));
            }
        }
        None => {
            // First block for (account, token).
            if !state.hashables.previous.is_zero() {
                return Ok(ProcessReturn::with_code(ProcessResult::GapPrevious));
            }
            if !token.is_zero() && !ledger.store.block_exists(txn, &token)? {
                return Ok(ProcessReturn::with_code(ProcessResult::GapSmartContract));
            }
            // An open must claim a credit.
            if state.hashables.link.is_zero() {
                return Ok(ProcessReturn::with_code(ProcessResult::GapSource));
            }
            amount = state.hashables.balance;
        }
    }

    if !is_send {
        if !state.hashables.link.is_zero() {
            // Receive or open.
            let source = state.hashables.link.as_block_hash();
            if !ledger.store.block_exists(txn, &source)? {
                return Ok(ProcessReturn::with_code(ProcessResult::GapSource));
            }
            let key = PendingKey::new(state.hashables.account, source);
            let Some(pending) = ledger.store.pending_get(txn, &key)? else {
                return Ok(ProcessReturn::with_code(ProcessResult::Unreceivable));
            };
            // A credit can only be claimed on the token that minted it.
            if pending.token_type != token {
                return Ok(ProcessReturn::with_code(ProcessResult::Unreceivable));
            }
            if amount != pending.amount {
                return Ok(ProcessReturn::with_code(ProcessResult::BalanceMismatch));
            }
        } else if !amount.is_zero() {
            // A pure representative change keeps the balance.
            return Ok(ProcessReturn::with_code(ProcessResult::BalanceMismatch));
        }
    }

    ledger.store.block_put(txn, &hash, block)?;
    let (old_rep_block, old_balance, old_count, old_head) = match &existing {
        Some(info) => (info.rep_block, info.balance, info.block_count, info.head),
        None => (BlockHash::ZERO, Amount::ZERO, 0, BlockHash::ZERO),
    };
    if !old_rep_block.is_zero() {
        // Move existing delegation off the previous rep block.
        ledger
            .store
            .representation_sub(txn, &old_rep_block, old_balance)?;
    }
    ledger
        .store
        .representation_add(txn, &hash, state.hashables.balance)?;

    if is_send {
        ledger.store.pending_put(
            txn,
            &PendingKey::new(state.hashables.link.as_account(), hash),
            &PendingInfo {
                source: state.hashables.account,
                amount,
                token_type: token,
            },
        )?;
    } else if !state.hashables.link.is_zero() {
        ledger.store.pending_del(
            txn,
            &PendingKey::new(state.hashables.account, state.hashables.link.as_block_hash()),
        )?;
    }

    ledger.change_latest(
        txn,
        &state.hashables.account,
        &token,
        hash,
        hash,
        state.hashables.balance,
        old_count + 1,
        true,
    )?;
    // State heads never sit in the frontier table, which also keeps
    // legacy blocks from chaining on top of them.
    if !old_head.is_zero() && ledger.store.frontier_get(txn, &old_head)?.is_some() {
        ledger.store.frontier_del(txn, &old_head)?;
    }
    debug!(block = %hash, account = %state.hashables.account, is_send, "applied state");
    Ok(ProcessReturn {
        code: ProcessResult::Progress,
        account: state.hashables.account,
        amount,
        pending_account: Account::ZERO,
        state_is_send: is_send,
    })
}

fn process_smart_contract(
    ledger: &Ledger,
    txn: &mut RwTxn,
    block: &Block,
    contract: &SmartContractBlock,
) -> Result<ProcessReturn, LedgerError> {
    let hash = contract.hash();
    if ledger.store.block_exists(txn, &hash)? {
        return Ok(ProcessReturn::with_code(ProcessResult::Old));
    }
    if contract.hashables.sc_account.is_zero() || contract.hashables.sc_owner_account.is_zero() {
        return Ok(ProcessReturn::with_code(ProcessResult::ScAccountMismatch));
    }
    if !validate_message(&contract.hashables.sc_account, &hash, &contract.signature) {
        return Ok(ProcessReturn::with_code(ProcessResult::BadSignature));
    }
    if contract.hashables.abi_hash != contract.hashables.hash_abi() {
        return Ok(ProcessReturn::with_code(ProcessResult::AbiMismatch));
    }
    if ledger.store.abi_exists(txn, &contract.hashables.abi_hash)? {
        return Ok(ProcessReturn::with_code(ProcessResult::AbiAlreadyExist));
    }

    ledger.store.block_put(txn, &hash, block)?;
    ledger
        .store
        .abi_put(txn, &contract.hashables.abi_hash, &contract.hashables.abi)?;
    debug!(block = %hash, account = %contract.hashables.sc_account, "registered smart contract");
    Ok(ProcessReturn {
        code: ProcessResult::Progress,
        account: contract.hashables.sc_account,
        amount: Amount::ZERO,
        pending_account: Account::ZERO,
        state_is_send: false,
    })
}
