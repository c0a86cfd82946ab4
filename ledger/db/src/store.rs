// Copyright (c) 2024 The Lattice Project

//! LMDB-backed ledger storage using heed.
//!
//! Eight named databases inside one environment. Every accessor takes an
//! explicit transaction; nothing here commits. Block values are the wire
//! form of the block followed by the 32-byte hash of its successor (zero
//! while unlinked), so fork detection and forward walks are one lookup.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions, RoTxn, RwTxn};
use lattice_blockchain_types::{Account, Amount, Block, BlockHash, TokenType};
use serde::{Deserialize, Serialize};

use crate::LedgerError;

// LMDB database names.
const BLOCKS_DB_NAME: &str = "blocks";
const ACCOUNTS_DB_NAME: &str = "accounts";
const PENDING_DB_NAME: &str = "pending";
const REPRESENTATION_DB_NAME: &str = "representation";
const FRONTIER_DB_NAME: &str = "frontier";
const BLOCK_INFO_DB_NAME: &str = "block_info";
const CHECKSUM_DB_NAME: &str = "checksum";
const ABI_DB_NAME: &str = "abi";

// Single row of the checksum table.
const CHECKSUM_KEY: [u8; 8] = [0u8; 8];

/// Per-(account, token) chain head row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub head: BlockHash,
    pub open_block: BlockHash,
    pub rep_block: BlockHash,
    pub balance: Amount,
    pub modified: u64,
    pub block_count: u64,
}

/// An unclaimed credit, keyed by (destination, send hash).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingInfo {
    pub source: Account,
    pub amount: Amount,
    pub token_type: TokenType,
}

/// Key of a pending credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingKey {
    pub destination: Account,
    pub hash: BlockHash,
}

impl PendingKey {
    pub fn new(destination: Account, hash: BlockHash) -> Self {
        Self { destination, hash }
    }

    fn to_bytes(self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(self.destination.as_bytes());
        out[32..].copy_from_slice(self.hash.as_bytes());
        out
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        if bytes.len() != 64 {
            return Err(LedgerError::Corrupt("pending key length"));
        }
        let mut destination = [0u8; 32];
        destination.copy_from_slice(&bytes[..32]);
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes[32..]);
        Ok(Self {
            destination: Account(destination),
            hash: BlockHash(hash),
        })
    }
}

/// Account-chain checkpoint written every `block_info_max` blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub account: Account,
    pub balance: Amount,
}

/// A normalized copy of every table, for integrity audits and tests.
/// Account rows have their modification times zeroed so two snapshots of
/// semantically identical ledgers compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub tables: BTreeMap<&'static str, BTreeMap<Vec<u8>, Vec<u8>>>,
}

fn accounts_key(account: &Account, token: &TokenType) -> [u8; 64] {
    let mut out = [0u8; 64];
    out[..32].copy_from_slice(account.as_bytes());
    out[32..].copy_from_slice(token.as_bytes());
    out
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, LedgerError> {
    bincode::serialize(value).map_err(|e| LedgerError::Serialization(e.to_string()))
}

fn decode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, LedgerError> {
    bincode::deserialize(bytes).map_err(|e| LedgerError::Serialization(e.to_string()))
}

pub(crate) fn seconds_since_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// The transactional table environment.
pub struct LedgerDb {
    env: Env,
    blocks: Database<Bytes, Bytes>,
    accounts: Database<Bytes, Bytes>,
    pending: Database<Bytes, Bytes>,
    representation: Database<Bytes, Bytes>,
    frontier: Database<Bytes, Bytes>,
    block_info: Database<Bytes, Bytes>,
    checksum: Database<Bytes, Bytes>,
    abi: Database<Bytes, Bytes>,
}

impl LedgerDb {
    /// Open or create the environment at `path`.
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        fs::create_dir_all(path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .max_dbs(8)
                .map_size(1024 * 1024 * 1024) // 1GB
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let blocks = env.create_database(&mut wtxn, Some(BLOCKS_DB_NAME))?;
        let accounts = env.create_database(&mut wtxn, Some(ACCOUNTS_DB_NAME))?;
        let pending = env.create_database(&mut wtxn, Some(PENDING_DB_NAME))?;
        let representation = env.create_database(&mut wtxn, Some(REPRESENTATION_DB_NAME))?;
        let frontier = env.create_database(&mut wtxn, Some(FRONTIER_DB_NAME))?;
        let block_info = env.create_database(&mut wtxn, Some(BLOCK_INFO_DB_NAME))?;
        let checksum = env.create_database(&mut wtxn, Some(CHECKSUM_DB_NAME))?;
        let abi = env.create_database(&mut wtxn, Some(ABI_DB_NAME))?;
        wtxn.commit()?;

        Ok(Self {
            env,
            blocks,
            accounts,
            pending,
            representation,
            frontier,
            block_info,
            checksum,
            abi,
        })
    }

    pub fn read_txn(&self) -> Result<RoTxn<'_>, LedgerError> {
        Ok(self.env.read_txn()?)
    }

    pub fn write_txn(&self) -> Result<RwTxn<'_>, LedgerError> {
        Ok(self.env.write_txn()?)
    }

    // ------------------------------------------------------------------
    // blocks
    // ------------------------------------------------------------------

    /// Store a block, link it as its predecessor's successor, and fold
    /// its hash into the ledger checksum.
    pub fn block_put(
        &self,
        txn: &mut RwTxn,
        hash: &BlockHash,
        block: &Block,
    ) -> Result<(), LedgerError> {
        let mut value = block.serialize();
        value.extend_from_slice(BlockHash::ZERO.as_bytes());
        self.blocks.put(txn, hash.as_bytes(), &value)?;
        let previous = block.previous();
        if !previous.is_zero() {
            self.set_successor(txn, &previous, hash)?;
        }
        self.checksum_update(txn, hash)?;
        Ok(())
    }

    /// Delete a block and fold its hash out of the ledger checksum.
    pub fn block_del(&self, txn: &mut RwTxn, hash: &BlockHash) -> Result<(), LedgerError> {
        self.blocks.delete(txn, hash.as_bytes())?;
        self.checksum_update(txn, hash)?;
        Ok(())
    }

    pub fn block_get(&self, txn: &RoTxn, hash: &BlockHash) -> Result<Option<Block>, LedgerError> {
        match self.blocks.get(txn, hash.as_bytes())? {
            None => Ok(None),
            Some(bytes) => {
                let (block, _) = Block::deserialize(bytes)
                    .map_err(|_| LedgerError::Corrupt("stored block bytes"))?;
                Ok(Some(block))
            }
        }
    }

    pub fn block_exists(&self, txn: &RoTxn, hash: &BlockHash) -> Result<bool, LedgerError> {
        Ok(self.blocks.get(txn, hash.as_bytes())?.is_some())
    }

    /// The block whose `previous` is `hash`, if one has been applied.
    pub fn block_successor(
        &self,
        txn: &RoTxn,
        hash: &BlockHash,
    ) -> Result<Option<BlockHash>, LedgerError> {
        match self.blocks.get(txn, hash.as_bytes())? {
            None => Ok(None),
            Some(bytes) => {
                if bytes.len() < 32 {
                    return Err(LedgerError::Corrupt("block entry too short"));
                }
                let mut successor = [0u8; 32];
                successor.copy_from_slice(&bytes[bytes.len() - 32..]);
                let successor = BlockHash(successor);
                Ok(if successor.is_zero() {
                    None
                } else {
                    Some(successor)
                })
            }
        }
    }

    pub fn block_successor_clear(
        &self,
        txn: &mut RwTxn,
        hash: &BlockHash,
    ) -> Result<(), LedgerError> {
        self.set_successor(txn, hash, &BlockHash::ZERO)
    }

    fn set_successor(
        &self,
        txn: &mut RwTxn,
        hash: &BlockHash,
        successor: &BlockHash,
    ) -> Result<(), LedgerError> {
        let Some(bytes) = self.blocks.get(txn, hash.as_bytes())? else {
            return Err(LedgerError::BlockNotFound(*hash));
        };
        if bytes.len() < 32 {
            return Err(LedgerError::Corrupt("block entry too short"));
        }
        let mut value = bytes.to_vec();
        let at = value.len() - 32;
        value[at..].copy_from_slice(successor.as_bytes());
        self.blocks.put(txn, hash.as_bytes(), &value)?;
        Ok(())
    }

    /// Number of stored blocks.
    pub fn block_count(&self, txn: &RoTxn) -> Result<u64, LedgerError> {
        Ok(self.blocks.len(txn)?)
    }

    // ------------------------------------------------------------------
    // accounts
    // ------------------------------------------------------------------

    pub fn accounts_get(
        &self,
        txn: &RoTxn,
        account: &Account,
        token: &TokenType,
    ) -> Result<Option<AccountInfo>, LedgerError> {
        match self.accounts.get(txn, &accounts_key(account, token))? {
            None => Ok(None),
            Some(bytes) => Ok(Some(decode(bytes)?)),
        }
    }

    pub fn accounts_put(
        &self,
        txn: &mut RwTxn,
        account: &Account,
        token: &TokenType,
        info: &AccountInfo,
    ) -> Result<(), LedgerError> {
        self.accounts
            .put(txn, &accounts_key(account, token), &encode(info)?)?;
        Ok(())
    }

    pub fn accounts_del(
        &self,
        txn: &mut RwTxn,
        account: &Account,
        token: &TokenType,
    ) -> Result<(), LedgerError> {
        self.accounts.delete(txn, &accounts_key(account, token))?;
        Ok(())
    }

    /// Whether any chain exists for `account` on any token.
    pub fn account_exists(&self, txn: &RoTxn, account: &Account) -> Result<bool, LedgerError> {
        let mut iter = self.accounts.prefix_iter(txn, account.as_bytes())?;
        Ok(iter.next().transpose()?.is_some())
    }

    /// Every account row, for enumeration surfaces and integrity audits.
    pub fn accounts_list(
        &self,
        txn: &RoTxn,
    ) -> Result<Vec<(Account, TokenType, AccountInfo)>, LedgerError> {
        let mut out = Vec::new();
        for entry in self.accounts.iter(txn)? {
            let (key, value) = entry?;
            if key.len() != 64 {
                return Err(LedgerError::Corrupt("accounts key length"));
            }
            let mut account = [0u8; 32];
            account.copy_from_slice(&key[..32]);
            let mut token = [0u8; 32];
            token.copy_from_slice(&key[32..]);
            out.push((Account(account), BlockHash(token), decode(value)?));
        }
        Ok(out)
    }

    // ------------------------------------------------------------------
    // pending
    // ------------------------------------------------------------------

    pub fn pending_get(
        &self,
        txn: &RoTxn,
        key: &PendingKey,
    ) -> Result<Option<PendingInfo>, LedgerError> {
        match self.pending.get(txn, &key.to_bytes())? {
            None => Ok(None),
            Some(bytes) => Ok(Some(decode(bytes)?)),
        }
    }

    pub fn pending_exists(&self, txn: &RoTxn, key: &PendingKey) -> Result<bool, LedgerError> {
        Ok(self.pending.get(txn, &key.to_bytes())?.is_some())
    }

    pub fn pending_put(
        &self,
        txn: &mut RwTxn,
        key: &PendingKey,
        info: &PendingInfo,
    ) -> Result<(), LedgerError> {
        self.pending.put(txn, &key.to_bytes(), &encode(info)?)?;
        Ok(())
    }

    pub fn pending_del(&self, txn: &mut RwTxn, key: &PendingKey) -> Result<(), LedgerError> {
        self.pending.delete(txn, &key.to_bytes())?;
        Ok(())
    }

    /// All pending credits destined for `account`.
    pub fn pending_for_account(
        &self,
        txn: &RoTxn,
        account: &Account,
    ) -> Result<Vec<(PendingKey, PendingInfo)>, LedgerError> {
        let mut out = Vec::new();
        for entry in self.pending.prefix_iter(txn, account.as_bytes())? {
            let (key, value) = entry?;
            out.push((PendingKey::from_bytes(key)?, decode(value)?));
        }
        Ok(out)
    }

    // ------------------------------------------------------------------
    // representation
    // ------------------------------------------------------------------

    /// Voting weight delegated to `representative`, zero when absent.
    pub fn representation_get(
        &self,
        txn: &RoTxn,
        representative: &Account,
    ) -> Result<Amount, LedgerError> {
        match self.representation.get(txn, representative.as_bytes())? {
            None => Ok(Amount::ZERO),
            Some(bytes) => {
                let raw: [u8; 16] = bytes
                    .try_into()
                    .map_err(|_| LedgerError::Corrupt("representation weight length"))?;
                Ok(Amount::from_be_bytes(raw))
            }
        }
    }

    pub fn representation_put(
        &self,
        txn: &mut RwTxn,
        representative: &Account,
        weight: Amount,
    ) -> Result<(), LedgerError> {
        if weight.is_zero() {
            self.representation.delete(txn, representative.as_bytes())?;
        } else {
            self.representation
                .put(txn, representative.as_bytes(), &weight.to_be_bytes())?;
        }
        Ok(())
    }

    /// Add delegated weight via the block that pins the delegation. The
    /// row adjusted belongs to that block's representative.
    pub fn representation_add(
        &self,
        txn: &mut RwTxn,
        rep_block: &BlockHash,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let representative = self.representative_of(txn, rep_block)?;
        let weight = self.representation_get(txn, &representative)?;
        self.representation_put(txn, &representative, weight.wrapping_add(amount))
    }

    /// Remove delegated weight via the block that pins the delegation.
    pub fn representation_sub(
        &self,
        txn: &mut RwTxn,
        rep_block: &BlockHash,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let representative = self.representative_of(txn, rep_block)?;
        let weight = self.representation_get(txn, &representative)?;
        self.representation_put(txn, &representative, weight.wrapping_sub(amount))
    }

    fn representative_of(
        &self,
        txn: &RoTxn,
        rep_block: &BlockHash,
    ) -> Result<Account, LedgerError> {
        let block = self
            .block_get(txn, rep_block)?
            .ok_or(LedgerError::BlockNotFound(*rep_block))?;
        let representative = block.representative();
        if representative.is_zero() {
            return Err(LedgerError::Corrupt("rep block names no representative"));
        }
        Ok(representative)
    }

    // ------------------------------------------------------------------
    // frontier
    // ------------------------------------------------------------------

    pub fn frontier_get(
        &self,
        txn: &RoTxn,
        hash: &BlockHash,
    ) -> Result<Option<Account>, LedgerError> {
        match self.frontier.get(txn, hash.as_bytes())? {
            None => Ok(None),
            Some(bytes) => {
                let raw: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| LedgerError::Corrupt("frontier account length"))?;
                Ok(Some(Account(raw)))
            }
        }
    }

    pub fn frontier_put(
        &self,
        txn: &mut RwTxn,
        hash: &BlockHash,
        account: &Account,
    ) -> Result<(), LedgerError> {
        self.frontier.put(txn, hash.as_bytes(), account.as_bytes())?;
        Ok(())
    }

    pub fn frontier_del(&self, txn: &mut RwTxn, hash: &BlockHash) -> Result<(), LedgerError> {
        self.frontier.delete(txn, hash.as_bytes())?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // block_info checkpoints
    // ------------------------------------------------------------------

    pub fn block_info_get(
        &self,
        txn: &RoTxn,
        hash: &BlockHash,
    ) -> Result<Option<BlockInfo>, LedgerError> {
        match self.block_info.get(txn, hash.as_bytes())? {
            None => Ok(None),
            Some(bytes) => Ok(Some(decode(bytes)?)),
        }
    }

    pub fn block_info_put(
        &self,
        txn: &mut RwTxn,
        hash: &BlockHash,
        info: &BlockInfo,
    ) -> Result<(), LedgerError> {
        self.block_info.put(txn, hash.as_bytes(), &encode(info)?)?;
        Ok(())
    }

    pub fn block_info_del(&self, txn: &mut RwTxn, hash: &BlockHash) -> Result<(), LedgerError> {
        self.block_info.delete(txn, hash.as_bytes())?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // checksum
    // ------------------------------------------------------------------

    /// XOR-fold of every block hash that has entered or left the ledger.
    pub fn checksum_get(&self, txn: &RoTxn) -> Result<BlockHash, LedgerError> {
        match self.checksum.get(txn, &CHECKSUM_KEY)? {
            None => Ok(BlockHash::ZERO),
            Some(bytes) => {
                let raw: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| LedgerError::Corrupt("checksum length"))?;
                Ok(BlockHash(raw))
            }
        }
    }

    fn checksum_update(&self, txn: &mut RwTxn, hash: &BlockHash) -> Result<(), LedgerError> {
        let value = self.checksum_get(txn)? ^ *hash;
        self.checksum.put(txn, &CHECKSUM_KEY, value.as_bytes())?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // abi
    // ------------------------------------------------------------------

    pub fn abi_get(&self, txn: &RoTxn, abi_hash: &BlockHash) -> Result<Option<Vec<u8>>, LedgerError> {
        Ok(self.abi.get(txn, abi_hash.as_bytes())?.map(<[u8]>::to_vec))
    }

    pub fn abi_exists(&self, txn: &RoTxn, abi_hash: &BlockHash) -> Result<bool, LedgerError> {
        Ok(self.abi.get(txn, abi_hash.as_bytes())?.is_some())
    }

    pub fn abi_put(
        &self,
        txn: &mut RwTxn,
        abi_hash: &BlockHash,
        abi: &[u8],
    ) -> Result<(), LedgerError> {
        self.abi.put(txn, abi_hash.as_bytes(), abi)?;
        Ok(())
    }

    pub fn abi_del(&self, txn: &mut RwTxn, abi_hash: &BlockHash) -> Result<(), LedgerError> {
        self.abi.delete(txn, abi_hash.as_bytes())?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // snapshot
    // ------------------------------------------------------------------

    /// Normalized copy of every table.
    pub fn snapshot(&self, txn: &RoTxn) -> Result<LedgerSnapshot, LedgerError> {
        let mut tables = BTreeMap::new();
        let named: [(&'static str, &Database<Bytes, Bytes>); 8] = [
            (BLOCKS_DB_NAME, &self.blocks),
            (ACCOUNTS_DB_NAME, &self.accounts),
            (PENDING_DB_NAME, &self.pending),
            (REPRESENTATION_DB_NAME, &self.representation),
            (FRONTIER_DB_NAME, &self.frontier),
            (BLOCK_INFO_DB_NAME, &self.block_info),
            (CHECKSUM_DB_NAME, &self.checksum),
            (ABI_DB_NAME, &self.abi),
        ];
        for (name, db) in named {
            let mut rows = BTreeMap::new();
            for entry in db.iter(txn)? {
                let (key, value) = entry?;
                let value = if name == ACCOUNTS_DB_NAME {
                    let mut info: AccountInfo = decode(value)?;
                    info.modified = 0;
                    encode(&info)?
                } else {
                    value.to_vec()
                };
                rows.insert(key.to_vec(), value);
            }
            tables.insert(name, rows);
        }
        Ok(LedgerSnapshot { tables })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_blockchain_types::{SendBlock, CHAIN_TOKEN};
    use lattice_crypto_keys::Ed25519Pair;
    use tempfile::tempdir;

    fn make_send(previous: BlockHash) -> (BlockHash, Block) {
        let pair = Ed25519Pair::from_seed(&[7u8; 32]);
        let block = SendBlock::new(
            previous,
            Account::from_bytes([2u8; 32]),
            Amount::new(5),
            &pair,
            1,
        );
        (block.hash(), Block::Send(block))
    }

    #[test]
    fn test_open_creates_tables() {
        let dir = tempdir().unwrap();
        let store = LedgerDb::open(dir.path()).unwrap();
        let txn = store.read_txn().unwrap();
        assert_eq!(store.block_count(&txn).unwrap(), 0);
        assert_eq!(store.checksum_get(&txn).unwrap(), BlockHash::ZERO);
    }

    #[test]
    fn test_block_put_get_del_updates_checksum() {
        let dir = tempdir().unwrap();
        let store = LedgerDb::open(dir.path()).unwrap();
        let (hash, block) = make_send(BlockHash::ZERO);

        let mut txn = store.write_txn().unwrap();
        store.block_put(&mut txn, &hash, &block).unwrap();
        assert_eq!(store.block_get(&txn, &hash).unwrap().unwrap(), block);
        assert_eq!(store.checksum_get(&txn).unwrap(), hash);

        store.block_del(&mut txn, &hash).unwrap();
        assert!(store.block_get(&txn, &hash).unwrap().is_none());
        assert_eq!(store.checksum_get(&txn).unwrap(), BlockHash::ZERO);
    }

    #[test]
    fn test_successor_linking() {
        let dir = tempdir().unwrap();
        let store = LedgerDb::open(dir.path()).unwrap();
        let (first_hash, first) = make_send(BlockHash::ZERO);
        let (second_hash, second) = make_send(first_hash);

        let mut txn = store.write_txn().unwrap();
        store.block_put(&mut txn, &first_hash, &first).unwrap();
        assert!(store.block_successor(&txn, &first_hash).unwrap().is_none());

        store.block_put(&mut txn, &second_hash, &second).unwrap();
        assert_eq!(
            store.block_successor(&txn, &first_hash).unwrap(),
            Some(second_hash)
        );

        store.block_successor_clear(&mut txn, &first_hash).unwrap();
        assert!(store.block_successor(&txn, &first_hash).unwrap().is_none());
    }

    #[test]
    fn test_account_roundtrip() {
        let dir = tempdir().unwrap();
        let store = LedgerDb::open(dir.path()).unwrap();
        let account = Account::from_bytes([3u8; 32]);
        let info = AccountInfo {
            head: BlockHash::from_bytes([1u8; 32]),
            open_block: BlockHash::from_bytes([1u8; 32]),
            rep_block: BlockHash::from_bytes([1u8; 32]),
            balance: Amount::new(10),
            modified: 12345,
            block_count: 1,
        };

        let mut txn = store.write_txn().unwrap();
        store
            .accounts_put(&mut txn, &account, &CHAIN_TOKEN, &info)
            .unwrap();
        assert_eq!(
            store.accounts_get(&txn, &account, &CHAIN_TOKEN).unwrap(),
            Some(info)
        );
        assert!(store.account_exists(&txn, &account).unwrap());

        store.accounts_del(&mut txn, &account, &CHAIN_TOKEN).unwrap();
        assert!(store
            .accounts_get(&txn, &account, &CHAIN_TOKEN)
            .unwrap()
            .is_none());
        assert!(!store.account_exists(&txn, &account).unwrap());
    }

    #[test]
    fn test_pending_prefix_iteration() {
        let dir = tempdir().unwrap();
        let store = LedgerDb::open(dir.path()).unwrap();
        let destination = Account::from_bytes([4u8; 32]);
        let other = Account::from_bytes([5u8; 32]);

        let mut txn = store.write_txn().unwrap();
        for i in 0..3u8 {
            let key = PendingKey::new(destination, BlockHash::from_bytes([i; 32]));
            let info = PendingInfo {
                source: Account::from_bytes([9u8; 32]),
                amount: Amount::new(i as u128 + 1),
                token_type: CHAIN_TOKEN,
            };
            store.pending_put(&mut txn, &key, &info).unwrap();
        }
        let stray = PendingKey::new(other, BlockHash::from_bytes([9u8; 32]));
        let info = PendingInfo {
            source: Account::from_bytes([9u8; 32]),
            amount: Amount::new(99),
            token_type: CHAIN_TOKEN,
        };
        store.pending_put(&mut txn, &stray, &info).unwrap();

        let rows = store.pending_for_account(&txn, &destination).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|(key, _)| key.destination == destination));
    }

    #[test]
    fn test_representation_rows_vanish_at_zero() {
        let dir = tempdir().unwrap();
        let store = LedgerDb::open(dir.path()).unwrap();
        let representative = Account::from_bytes([6u8; 32]);

        let mut txn = store.write_txn().unwrap();
        store
            .representation_put(&mut txn, &representative, Amount::new(5))
            .unwrap();
        assert_eq!(
            store.representation_get(&txn, &representative).unwrap(),
            Amount::new(5)
        );
        store
            .representation_put(&mut txn, &representative, Amount::ZERO)
            .unwrap();
        let snapshot = store.snapshot(&txn).unwrap();
        assert!(snapshot.tables[REPRESENTATION_DB_NAME].is_empty());
    }
}
