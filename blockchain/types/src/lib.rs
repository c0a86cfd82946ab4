// Copyright (c) 2024 The Lattice Project

//! Block model, primitive types and codecs for the lattice ledger.
//!
//! Accounts own chains of blocks linked by `previous`; value moves as
//! send/receive half-operations, the state form consolidates both, and
//! smart-contract blocks register token identities. This crate holds the
//! consensus-critical shapes: fixed-width primitives, the six block
//! variants, their BLAKE2b hashing, and the wire and JSON codecs.

mod block;
mod primitives;
mod work;

pub use block::{
    Block, BlockType, ChangeBlock, ChangeHashables, OpenBlock, OpenHashables, ReceiveBlock,
    ReceiveHashables, SendBlock, SendHashables, SmartContractBlock, SmartContractHashables,
    StateBlock, StateHashables,
};
pub use primitives::{
    work_decode_hex, work_encode_hex, Account, Amount, BlockHash, Link, ParseError, TokenType,
    BURN_ACCOUNT, CHAIN_TOKEN,
};
pub use work::{
    work_generate, work_valid, work_value, MAIN_WORK_THRESHOLD, TEST_WORK_THRESHOLD,
};
