// Copyright (c) 2024 The Lattice Project

//! LMDB-backed ledger store and block processor.
//!
//! The write path is [`Ledger::process`] and [`Ledger::rollback`], both
//! running inside a caller-provided write transaction; commit on
//! `Progress`, abort on anything else, and nothing partial ever lands.
//! Consensus verdicts come back as [`ProcessResult`] values, not errors;
//! the `Result` channel is reserved for environment failures.

mod constants;
mod ledger;
mod processor;
mod rollback;
mod store;

pub use constants::{testnet_genesis_pair, LedgerConstants, Network, BLOCK_INFO_MAX};
pub use ledger::{Ledger, Votes};
pub use processor::{ProcessResult, ProcessReturn};
pub use store::{AccountInfo, BlockInfo, LedgerDb, LedgerSnapshot, PendingInfo, PendingKey};

use lattice_blockchain_types::BlockHash;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("database error: {0}")]
    Database(#[from] heed::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("block not found: {0}")]
    BlockNotFound(BlockHash),

    #[error("no account row for the requested chain")]
    AccountNotFound,

    #[error("corrupt ledger entry: {0}")]
    Corrupt(&'static str),
}
