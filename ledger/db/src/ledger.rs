// Copyright (c) 2024 The Lattice Project

//! The ledger: processing, rollback and the query surface.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use heed::{RoTxn, RwTxn};
use lattice_blockchain_types::{
    work_valid, Account, Amount, Block, BlockHash, StateBlock, TokenType, CHAIN_TOKEN,
};
use tracing::info;

use crate::constants::{LedgerConstants, Network};
use crate::processor::{self, ProcessReturn};
use crate::rollback;
use crate::store::{seconds_since_epoch, AccountInfo, BlockInfo, LedgerDb};
use crate::LedgerError;

/// A set of votes: one endorsed block per voting account. Re-voting
/// replaces the earlier endorsement.
#[derive(Debug, Clone, Default)]
pub struct Votes {
    pub rep_votes: BTreeMap<Account, Block>,
}

impl Votes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vote(&mut self, voter: Account, block: Block) {
        self.rep_votes.insert(voter, block);
    }
}

/// The ledger core. All mutation goes through [`Ledger::process`] and
/// [`Ledger::rollback`], inside a caller-provided write transaction.
pub struct Ledger {
    pub store: LedgerDb,
    pub constants: LedgerConstants,
    check_bootstrap_weights: AtomicBool,
}

impl Ledger {
    /// Wrap a store, seeding the genesis block if the ledger is empty.
    pub fn new(store: LedgerDb, constants: LedgerConstants) -> Result<Self, LedgerError> {
        let ledger = Self {
            store,
            constants,
            check_bootstrap_weights: AtomicBool::new(true),
        };
        let empty = {
            let txn = ledger.store.read_txn()?;
            ledger.store.block_count(&txn)? == 0
        };
        if empty {
            let mut txn = ledger.store.write_txn()?;
            ledger.initialize(&mut txn)?;
            txn.commit()?;
        }
        Ok(ledger)
    }

    /// Open or create a ledger at `path` for a network.
    pub fn open(path: &Path, network: Network) -> Result<Self, LedgerError> {
        let store = LedgerDb::open(path)?;
        Self::new(store, LedgerConstants::for_network(network))
    }

    /// Seed the distinguished genesis open block: the full supply minted
    /// to one account, delegated to itself.
    fn initialize(&self, txn: &mut RwTxn) -> Result<(), LedgerError> {
        let genesis = &self.constants.genesis_block;
        let hash = genesis.hash();
        let account = self.constants.genesis_account;
        self.store
            .block_put(txn, &hash, &Block::Open(genesis.clone()))?;
        let block_info = AccountInfo {
            head: hash,
            open_block: hash,
            rep_block: hash,
            balance: self.constants.genesis_amount,
            modified: seconds_since_epoch(),
            block_count: 1,
        };
        self.store
            .accounts_put(txn, &account, &CHAIN_TOKEN, &block_info)?;
        self.store
            .representation_put(txn, &account, self.constants.genesis_amount)?;
        self.store.frontier_put(txn, &hash, &account)?;
        info!(network = %self.constants.network, genesis = %hash, "initialized empty ledger");
        Ok(())
    }

    // ------------------------------------------------------------------
    // mutation
    // ------------------------------------------------------------------

    /// Validate and apply one block. Only a `Progress` verdict writes
    /// anything; the caller commits or aborts the transaction.
    pub fn process(&self, txn: &mut RwTxn, block: &Block) -> Result<ProcessReturn, LedgerError> {
        processor::process(self, txn, block)
    }

    /// Unwind the chain containing `hash` until `hash` is gone. Cascades
    /// into dependent chains where a rolled-back send was already
    /// received.
    pub fn rollback(&self, txn: &mut RwTxn, hash: &BlockHash) -> Result<(), LedgerError> {
        let Some(block) = self.store.block_get(txn, hash)? else {
            return Err(LedgerError::BlockNotFound(*hash));
        };
        if matches!(block, Block::SmartContract(_)) {
            return rollback::rollback_one(self, txn, &Account::ZERO, &CHAIN_TOKEN, &block);
        }
        let (account, token) = self.chain_of(txn, hash)?;
        while self.store.block_exists(txn, hash)? {
            let account_info = self
                .store
                .accounts_get(txn, &account, &token)?
                .ok_or(LedgerError::AccountNotFound)?;
            let head = self
                .store
                .block_get(txn, &account_info.head)?
                .ok_or(LedgerError::BlockNotFound(account_info.head))?;
            rollback::rollback_one(self, txn, &account, &token, &head)?;
        }
        Ok(())
    }

    /// Rewrite the `(account, token)` head row. A zero `hash` deletes the
    /// row; a fresh row records `hash` as its open block. Non-state heads
    /// at a checkpoint interval also write a `block_info` entry.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn change_latest(
        &self,
        txn: &mut RwTxn,
        account: &Account,
        token: &TokenType,
        hash: BlockHash,
        rep_block: BlockHash,
        balance: Amount,
        block_count: u64,
        is_state: bool,
    ) -> Result<(), LedgerError> {
        let existing = self.store.accounts_get(txn, account, token)?;
        if hash.is_zero() {
            if existing.is_some() {
                self.store.accounts_del(txn, account, token)?;
            }
            return Ok(());
        }
        let open_block = existing.map_or(hash, |info| info.open_block);
        let info = AccountInfo {
            head: hash,
            open_block,
            rep_block,
            balance,
            modified: seconds_since_epoch(),
            block_count,
        };
        self.store.accounts_put(txn, account, token, &info)?;
        if block_count % self.constants.block_info_max == 0 && !is_state {
            self.store
                .block_info_put(txn, &hash, &BlockInfo { account: *account, balance })?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // balances and amounts
    // ------------------------------------------------------------------

    /// Balance of the chain as of `hash`, walking predecessors until a
    /// block states it outright.
    pub fn balance(&self, txn: &RoTxn, hash: &BlockHash) -> Result<Amount, LedgerError> {
        let mut total = Amount::ZERO;
        let mut cursor = *hash;
        while !cursor.is_zero() {
            let block = self
                .store
                .block_get(txn, &cursor)?
                .ok_or(LedgerError::BlockNotFound(cursor))?;
            match block {
                Block::Send(b) => {
                    total = total.saturating_add(b.hashables.balance);
                    break;
                }
                Block::State(b) => {
                    total = total.saturating_add(b.hashables.balance);
                    break;
                }
                Block::Receive(b) => {
                    total = total.saturating_add(self.amount(txn, &b.hashables.source)?);
                    cursor = b.hashables.previous;
                }
                Block::Open(b) => {
                    total = total.saturating_add(self.amount(txn, &b.hashables.source)?);
                    break;
                }
                Block::Change(b) => cursor = b.hashables.previous,
                Block::SmartContract(_) => break,
            }
        }
        Ok(total)
    }

    /// The amount a block moved: the send/receive delta, the claimed
    /// credit for opens, zero for changes and registrations.
    pub fn amount(&self, txn: &RoTxn, hash: &BlockHash) -> Result<Amount, LedgerError> {
        // The genesis open claims its account rather than a real block;
        // the amount behind that claim is the whole supply.
        if *hash == BlockHash(self.constants.genesis_account.0) {
            return Ok(self.constants.genesis_amount);
        }
        let block = self
            .store
            .block_get(txn, hash)?
            .ok_or(LedgerError::BlockNotFound(*hash))?;
        match block {
            Block::Send(b) => self
                .balance(txn, &b.hashables.previous)?
                .checked_sub(b.hashables.balance)
                .ok_or(LedgerError::Corrupt("send raises balance")),
            Block::Receive(b) => self.amount(txn, &b.hashables.source),
            Block::Open(b) => self.amount(txn, &b.hashables.source),
            Block::Change(_) => Ok(Amount::ZERO),
            Block::State(b) => {
                let previous = self.balance(txn, &b.hashables.previous)?;
                Ok(b.hashables.balance.abs_diff(previous))
            }
            Block::SmartContract(_) => Ok(Amount::ZERO),
        }
    }

    /// Stored balance of an `(account, token)` row, zero when absent.
    pub fn account_balance(
        &self,
        txn: &RoTxn,
        account: &Account,
        token: &TokenType,
    ) -> Result<Amount, LedgerError> {
        Ok(self
            .store
            .accounts_get(txn, account, token)?
            .map_or(Amount::ZERO, |info| info.balance))
    }

    /// Sum of unclaimed credits destined for `account` on `token`.
    pub fn account_pending(
        &self,
        txn: &RoTxn,
        account: &Account,
        token: &TokenType,
    ) -> Result<Amount, LedgerError> {
        let mut total = Amount::ZERO;
        for (_, pending) in self.store.pending_for_account(txn, account)? {
            if pending.token_type == *token {
                total = total.saturating_add(pending.amount);
            }
        }
        Ok(total)
    }

    // ------------------------------------------------------------------
    // chain resolution
    // ------------------------------------------------------------------

    /// The hash of the block currently pinning delegation for the chain
    /// containing `hash` (an open, change or state block).
    pub fn representative(&self, txn: &RoTxn, hash: &BlockHash) -> Result<BlockHash, LedgerError> {
        let mut cursor = *hash;
        loop {
            let block = self
                .store
                .block_get(txn, &cursor)?
                .ok_or(LedgerError::BlockNotFound(cursor))?;
            match block {
                Block::Open(_) | Block::Change(_) | Block::State(_) => return Ok(cursor),
                Block::Send(b) => cursor = b.hashables.previous,
                Block::Receive(b) => cursor = b.hashables.previous,
                Block::SmartContract(_) => {
                    return Err(LedgerError::Corrupt("smart contract blocks have no chain"))
                }
            }
        }
    }

    /// The account owning the chain that contains `hash`. State blocks
    /// answer in O(1); legacy blocks walk forward to a checkpoint, a
    /// state block, or the frontier head, at most `block_info_max` steps.
    pub fn account(&self, txn: &RoTxn, hash: &BlockHash) -> Result<Account, LedgerError> {
        let mut cursor = *hash;
        loop {
            let block = self
                .store
                .block_get(txn, &cursor)?
                .ok_or(LedgerError::BlockNotFound(cursor))?;
            if let Block::State(b) = &block {
                return Ok(b.hashables.account);
            }
            if let Some(block_info) = self.store.block_info_get(txn, &cursor)? {
                return Ok(block_info.account);
            }
            match self.store.block_successor(txn, &cursor)? {
                Some(next) => cursor = next,
                None => {
                    return self
                        .store
                        .frontier_get(txn, &cursor)?
                        .ok_or(LedgerError::AccountNotFound)
                }
            }
        }
    }

    /// The open block of the `(account, token)` chain containing `hash`.
    pub fn token_account(&self, txn: &RoTxn, hash: &BlockHash) -> Result<BlockHash, LedgerError> {
        let (account, token) = self.chain_of(txn, hash)?;
        let info = self
            .store
            .accounts_get(txn, &account, &token)?
            .ok_or(LedgerError::AccountNotFound)?;
        Ok(info.open_block)
    }

    /// The `(account, token)` pair owning the chain containing `hash`.
    pub(crate) fn chain_of(
        &self,
        txn: &RoTxn,
        hash: &BlockHash,
    ) -> Result<(Account, TokenType), LedgerError> {
        let block = self
            .store
            .block_get(txn, hash)?
            .ok_or(LedgerError::BlockNotFound(*hash))?;
        match block {
            Block::State(b) => Ok((b.hashables.account, b.hashables.token_hash)),
            Block::SmartContract(_) => {
                Err(LedgerError::Corrupt("smart contract blocks have no chain"))
            }
            _ => Ok((self.account(txn, hash)?, CHAIN_TOKEN)),
        }
    }

    /// Head of the `(account, token)` chain, zero when unopened.
    pub fn latest(
        &self,
        txn: &RoTxn,
        account: &Account,
        token: &TokenType,
    ) -> Result<BlockHash, LedgerError> {
        Ok(self
            .store
            .accounts_get(txn, account, token)?
            .map_or(BlockHash::ZERO, |info| info.head))
    }

    /// The work root for the account's next native block: its head, or
    /// the account itself when unopened.
    pub fn latest_root(&self, txn: &RoTxn, account: &Account) -> Result<BlockHash, LedgerError> {
        Ok(self
            .store
            .accounts_get(txn, account, &CHAIN_TOKEN)?
            .map_or(BlockHash(account.0), |info| info.head))
    }

    /// The block occupying the successor slot of `root`: the block whose
    /// `previous` is `root`, or the open block when `root` is an account.
    pub fn successor(&self, txn: &RoTxn, root: &BlockHash) -> Result<Option<Block>, LedgerError> {
        let successor = if let Some(info) =
            self.store.accounts_get(txn, &Account(root.0), &CHAIN_TOKEN)?
        {
            Some(info.open_block)
        } else {
            self.store.block_successor(txn, root)?
        };
        match successor {
            Some(hash) => self.store.block_get(txn, &hash),
            None => Ok(None),
        }
    }

    /// The block already occupying the position a rejected fork claims.
    pub fn forked_block(&self, txn: &RoTxn, block: &Block) -> Result<Option<Block>, LedgerError> {
        let root = block.root();
        if let Some(successor) = self.store.block_successor(txn, &root)? {
            return self.store.block_get(txn, &successor);
        }
        let token = match block {
            Block::State(b) => b.hashables.token_hash,
            _ => CHAIN_TOKEN,
        };
        match self.store.accounts_get(txn, &Account(root.0), &token)? {
            Some(info) => self.store.block_get(txn, &info.open_block),
            None => Ok(None),
        }
    }

    /// Whether a state block lowers its balance relative to its
    /// predecessor.
    pub fn is_send(&self, txn: &RoTxn, block: &StateBlock) -> Result<bool, LedgerError> {
        if block.hashables.previous.is_zero() {
            return Ok(false);
        }
        Ok(block.hashables.balance < self.balance(txn, &block.hashables.previous)?)
    }

    /// The account a block credits, zero when it credits nobody.
    pub fn block_destination(&self, txn: &RoTxn, block: &Block) -> Result<Account, LedgerError> {
        match block {
            Block::Send(b) => Ok(b.hashables.destination),
            Block::State(b) if self.is_send(txn, b)? => Ok(b.hashables.link.as_account()),
            _ => Ok(Account::ZERO),
        }
    }

    /// The send a block claims, zero when it claims nothing.
    pub fn block_source(&self, txn: &RoTxn, block: &Block) -> Result<BlockHash, LedgerError> {
        let source = block.source();
        if !source.is_zero() {
            return Ok(source);
        }
        match block {
            Block::State(b) if !self.is_send(txn, b)? => Ok(b.hashables.link.as_block_hash()),
            _ => Ok(BlockHash::ZERO),
        }
    }

    /// JSON rendering of a stored block.
    pub fn block_text(&self, txn: &RoTxn, hash: &BlockHash) -> Result<Option<String>, LedgerError> {
        Ok(self
            .store
            .block_get(txn, hash)?
            .map(|block| block.to_json_string()))
    }

    // ------------------------------------------------------------------
    // weights and votes
    // ------------------------------------------------------------------

    /// Voting weight of an account. While the ledger is still short of
    /// `bootstrap_weight_max_blocks`, published bootstrap weights
    /// override the local table; the check switches itself off for good
    /// once the threshold is crossed.
    pub fn weight(&self, txn: &RoTxn, account: &Account) -> Result<Amount, LedgerError> {
        if self.check_bootstrap_weights.load(Ordering::Relaxed) {
            let blocks = self.store.block_count(txn)?;
            if blocks < self.constants.bootstrap_weight_max_blocks {
                if let Some(weight) = self.constants.bootstrap_weights.get(account) {
                    return Ok(*weight);
                }
            } else {
                self.check_bootstrap_weights.store(false, Ordering::Relaxed);
            }
        }
        self.store.representation_get(txn, account)
    }

    /// Sum voter weights per endorsed block, heaviest first.
    pub fn tally(
        &self,
        txn: &RoTxn,
        votes: &Votes,
    ) -> Result<Vec<(Amount, Block)>, LedgerError> {
        let mut totals: Vec<(Block, Amount)> = Vec::new();
        for (voter, block) in &votes.rep_votes {
            let weight = self.weight(txn, voter)?;
            let hash = block.hash();
            match totals.iter_mut().find(|(b, _)| b.hash() == hash) {
                Some(entry) => entry.1 = entry.1.wrapping_add(weight),
                None => totals.push((block.clone(), weight)),
            }
        }
        let mut result: Vec<(Amount, Block)> =
            totals.into_iter().map(|(block, weight)| (weight, block)).collect();
        result.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(result)
    }

    /// The heaviest block in a vote set with its tally.
    pub fn winner(
        &self,
        txn: &RoTxn,
        votes: &Votes,
    ) -> Result<Option<(Amount, Block)>, LedgerError> {
        Ok(self.tally(txn, votes)?.into_iter().next())
    }

    // ------------------------------------------------------------------
    // misc
    // ------------------------------------------------------------------

    /// The XOR-fold checksum over applied block hashes.
    pub fn checksum(&self, txn: &RoTxn) -> Result<BlockHash, LedgerError> {
        self.store.checksum_get(txn)
    }

    /// Evaluate the work predicate for a block over its root.
    pub fn work_valid(&self, block: &Block) -> bool {
        work_valid(&block.root(), block.work(), self.constants.work_threshold)
    }
}
