// Copyright (c) 2024 The Lattice Project

//! Per-network ledger constants and the genesis record.

use std::collections::HashMap;

use lattice_blockchain_types::{
    work_generate, Account, Amount, BlockHash, OpenBlock, MAIN_WORK_THRESHOLD,
    TEST_WORK_THRESHOLD,
};
use lattice_crypto_keys::Ed25519Pair;

/// The network a ledger belongs to. Each network has its own genesis
/// block, so chains can never be mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Testnet => write!(f, "testnet"),
        }
    }
}

// TODO: replace with the key-ceremony account before mainnet launch.
const MAINNET_GENESIS_SEED: [u8; 32] = *b"LATTICE_MAINNET_GENESIS_SEED_V1\0";

const TESTNET_GENESIS_SEED: [u8; 32] = *b"LATTICE_TESTNET_GENESIS_SEED_V1\0";

/// Blocks between `block_info` checkpoints on legacy chains.
pub const BLOCK_INFO_MAX: u64 = 32;

/// Everything `Ledger` needs to know about its network, passed by value
/// into the constructor.
#[derive(Clone)]
pub struct LedgerConstants {
    pub network: Network,
    pub genesis_account: Account,
    pub genesis_block: OpenBlock,
    pub genesis_amount: Amount,
    pub work_threshold: u64,
    pub block_info_max: u64,
    /// Published weights used while the local ledger is still short of
    /// `bootstrap_weight_max_blocks`.
    pub bootstrap_weights: HashMap<Account, Amount>,
    pub bootstrap_weight_max_blocks: u64,
}

impl LedgerConstants {
    pub fn for_network(network: Network) -> Self {
        let (seed, work_threshold, bootstrap_weight_max_blocks) = match network {
            Network::Mainnet => (&MAINNET_GENESIS_SEED, MAIN_WORK_THRESHOLD, 10_000_000),
            Network::Testnet => (&TESTNET_GENESIS_SEED, TEST_WORK_THRESHOLD, 0),
        };
        let pair = Ed25519Pair::from_seed(seed);
        let genesis_account = Account::from(pair.public_key());
        // The genesis open claims its own account as source and mints the
        // entire supply. Seeding bypasses work validation, so the nonce
        // is ground at the test difficulty on every network.
        let root = BlockHash(genesis_account.0);
        let work = work_generate(&root, TEST_WORK_THRESHOLD);
        let genesis_block = OpenBlock::new(root, genesis_account, genesis_account, &pair, work);
        Self {
            network,
            genesis_account,
            genesis_block,
            genesis_amount: Amount::MAX,
            work_threshold,
            block_info_max: BLOCK_INFO_MAX,
            bootstrap_weights: HashMap::new(),
            bootstrap_weight_max_blocks,
        }
    }

    /// Testnet constants, the default for tests.
    pub fn test() -> Self {
        Self::for_network(Network::Testnet)
    }
}

/// The testnet genesis keypair. The seed is public by design: anyone can
/// spend the testnet supply.
pub fn testnet_genesis_pair() -> Ed25519Pair {
    Ed25519Pair::from_seed(&TESTNET_GENESIS_SEED)
}
