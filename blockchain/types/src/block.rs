// Copyright (c) 2024 The Lattice Project

//! The block variants and their canonical forms.
//!
//! Every block carries a signature over its BLAKE2b-256 hash and a work
//! nonce. The hash input is the concatenation of the hashable fields in
//! wire order; state-family blocks prefix a 32-byte preamble whose low
//! eight bytes hold the block-type discriminant. The byte layouts here
//! are consensus-critical: changing a single field order forks the chain.

use lattice_crypto_hashes::{Blake2b256, Digest};
use lattice_crypto_keys::{Ed25519Pair, Ed25519Signature};
use serde_json::{json, Value};

use crate::primitives::{
    work_decode_hex, work_encode_hex, Account, Amount, BlockHash, Link, ParseError, TokenType,
};

/// Wire discriminants for block types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BlockType {
    Invalid = 0,
    NotABlock = 1,
    Send = 2,
    Receive = 3,
    Open = 4,
    Change = 5,
    State = 6,
    SmartContract = 7,
}

impl BlockType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Invalid),
            1 => Some(Self::NotABlock),
            2 => Some(Self::Send),
            3 => Some(Self::Receive),
            4 => Some(Self::Open),
            5 => Some(Self::Change),
            6 => Some(Self::State),
            7 => Some(Self::SmartContract),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// The JSON `type` field value.
    pub fn name(self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::NotABlock => "not_a_block",
            Self::Send => "send",
            Self::Receive => "receive",
            Self::Open => "open",
            Self::Change => "change",
            Self::State => "state",
            Self::SmartContract => "smart_contract",
        }
    }
}

// State and smart-contract hashes share the state discriminant in the
// preamble.
const STATE_PREAMBLE: [u8; 32] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, BlockType::State as u8,
];

fn finalize(state: Blake2b256) -> BlockHash {
    BlockHash(state.finalize().into())
}

/// Cursor over a wire buffer.
struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ParseError> {
        if self.buf.len() - self.pos < N {
            return Err(ParseError::Truncated);
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ParseError> {
        if self.buf.len() - self.pos < len {
            return Err(ParseError::Truncated);
        }
        let out = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    fn read_work_le(&mut self) -> Result<u64, ParseError> {
        Ok(u64::from_le_bytes(self.read_array::<8>()?))
    }

    fn read_work_be(&mut self) -> Result<u64, ParseError> {
        Ok(u64::from_be_bytes(self.read_array::<8>()?))
    }

    fn consumed(&self) -> usize {
        self.pos
    }
}

fn json_str<'a>(tree: &'a Value, field: &'static str) -> Result<&'a str, ParseError> {
    tree.get(field)
        .and_then(Value::as_str)
        .ok_or(ParseError::Field(field))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendHashables {
    pub previous: BlockHash,
    pub destination: Account,
    pub balance: Amount,
}

impl SendHashables {
    fn hash(&self, state: &mut Blake2b256) {
        Digest::update(state, self.previous.as_bytes());
        Digest::update(state, self.destination.as_bytes());
        Digest::update(state, self.balance.to_be_bytes());
    }
}

/// Decreases the signer's balance to `balance`; the difference becomes a
/// pending credit for `destination`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendBlock {
    pub hashables: SendHashables,
    pub signature: Ed25519Signature,
    pub work: u64,
}

impl SendBlock {
    pub fn new(
        previous: BlockHash,
        destination: Account,
        balance: Amount,
        pair: &Ed25519Pair,
        work: u64,
    ) -> Self {
        let hashables = SendHashables {
            previous,
            destination,
            balance,
        };
        let mut block = Self {
            hashables,
            signature: Ed25519Signature::ZERO,
            work,
        };
        block.signature = pair.sign(block.hash().as_bytes());
        block
    }

    pub fn hash(&self) -> BlockHash {
        let mut state = Blake2b256::new();
        self.hashables.hash(&mut state);
        finalize(state)
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(32 + 32 + 16 + 64 + 8);
        out.extend_from_slice(self.hashables.previous.as_bytes());
        out.extend_from_slice(self.hashables.destination.as_bytes());
        out.extend_from_slice(&self.hashables.balance.to_be_bytes());
        out.extend_from_slice(self.signature.as_bytes());
        out.extend_from_slice(&self.work.to_le_bytes());
        out
    }

    fn from_reader(reader: &mut ByteReader<'_>) -> Result<Self, ParseError> {
        let previous = BlockHash(reader.read_array()?);
        let destination = Account(reader.read_array()?);
        let balance = Amount::from_be_bytes(reader.read_array()?);
        let signature = Ed25519Signature(reader.read_array()?);
        let work = reader.read_work_le()?;
        Ok(Self {
            hashables: SendHashables {
                previous,
                destination,
                balance,
            },
            signature,
            work,
        })
    }

    fn to_json(&self) -> Value {
        json!({
            "type": "send",
            "previous": self.hashables.previous.encode_hex(),
            "destination": self.hashables.destination.encode_account(),
            "balance": self.hashables.balance.encode_hex(),
            "work": work_encode_hex(self.work),
            "signature": hex::encode_upper(self.signature.as_bytes()),
        })
    }

    fn from_json(tree: &Value) -> Result<Self, ParseError> {
        let previous = BlockHash::decode_hex(json_str(tree, "previous")?)?;
        let destination = Account::decode_text(json_str(tree, "destination")?)?;
        let balance = Amount::decode_hex(json_str(tree, "balance")?)?;
        let work = work_decode_hex(json_str(tree, "work")?)?;
        let signature = decode_signature_hex(json_str(tree, "signature")?)?;
        Ok(Self {
            hashables: SendHashables {
                previous,
                destination,
                balance,
            },
            signature,
            work,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveHashables {
    pub previous: BlockHash,
    pub source: BlockHash,
}

impl ReceiveHashables {
    fn hash(&self, state: &mut Blake2b256) {
        Digest::update(state, self.previous.as_bytes());
        Digest::update(state, self.source.as_bytes());
    }
}

/// Claims the pending credit produced by the send whose hash is `source`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveBlock {
    pub hashables: ReceiveHashables,
    pub signature: Ed25519Signature,
    pub work: u64,
}

impl ReceiveBlock {
    pub fn new(previous: BlockHash, source: BlockHash, pair: &Ed25519Pair, work: u64) -> Self {
        let mut block = Self {
            hashables: ReceiveHashables { previous, source },
            signature: Ed25519Signature::ZERO,
            work,
        };
        block.signature = pair.sign(block.hash().as_bytes());
        block
    }

    pub fn hash(&self) -> BlockHash {
        let mut state = Blake2b256::new();
        self.hashables.hash(&mut state);
        finalize(state)
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(32 + 32 + 64 + 8);
        out.extend_from_slice(self.hashables.previous.as_bytes());
        out.extend_from_slice(self.hashables.source.as_bytes());
        out.extend_from_slice(self.signature.as_bytes());
        out.extend_from_slice(&self.work.to_le_bytes());
        out
    }

    fn from_reader(reader: &mut ByteReader<'_>) -> Result<Self, ParseError> {
        let previous = BlockHash(reader.read_array()?);
        let source = BlockHash(reader.read_array()?);
        let signature = Ed25519Signature(reader.read_array()?);
        let work = reader.read_work_le()?;
        Ok(Self {
            hashables: ReceiveHashables { previous, source },
            signature,
            work,
        })
    }

    fn to_json(&self) -> Value {
        json!({
            "type": "receive",
            "previous": self.hashables.previous.encode_hex(),
            "source": self.hashables.source.encode_hex(),
            "work": work_encode_hex(self.work),
            "signature": hex::encode_upper(self.signature.as_bytes()),
        })
    }

    fn from_json(tree: &Value) -> Result<Self, ParseError> {
        let previous = BlockHash::decode_hex(json_str(tree, "previous")?)?;
        let source = BlockHash::decode_hex(json_str(tree, "source")?)?;
        let work = work_decode_hex(json_str(tree, "work")?)?;
        let signature = decode_signature_hex(json_str(tree, "signature")?)?;
        Ok(Self {
            hashables: ReceiveHashables { previous, source },
            signature,
            work,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenHashables {
    pub source: BlockHash,
    pub representative: Account,
    pub account: Account,
}

impl OpenHashables {
    fn hash(&self, state: &mut Blake2b256) {
        Digest::update(state, self.source.as_bytes());
        Digest::update(state, self.representative.as_bytes());
        Digest::update(state, self.account.as_bytes());
    }
}

/// First block of an account chain; claims a pending credit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenBlock {
    pub hashables: OpenHashables,
    pub signature: Ed25519Signature,
    pub work: u64,
}

impl OpenBlock {
    pub fn new(
        source: BlockHash,
        representative: Account,
        account: Account,
        pair: &Ed25519Pair,
        work: u64,
    ) -> Self {
        let mut block = Self {
            hashables: OpenHashables {
                source,
                representative,
                account,
            },
            signature: Ed25519Signature::ZERO,
            work,
        };
        block.signature = pair.sign(block.hash().as_bytes());
        block
    }

    pub fn hash(&self) -> BlockHash {
        let mut state = Blake2b256::new();
        self.hashables.hash(&mut state);
        finalize(state)
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(32 + 32 + 32 + 64 + 8);
        out.extend_from_slice(self.hashables.source.as_bytes());
        out.extend_from_slice(self.hashables.representative.as_bytes());
        out.extend_from_slice(self.hashables.account.as_bytes());
        out.extend_from_slice(self.signature.as_bytes());
        out.extend_from_slice(&self.work.to_le_bytes());
        out
    }

    fn from_reader(reader: &mut ByteReader<'_>) -> Result<Self, ParseError> {
        let source = BlockHash(reader.read_array()?);
        let representative = Account(reader.read_array()?);
        let account = Account(reader.read_array()?);
        let signature = Ed25519Signature(reader.read_array()?);
        let work = reader.read_work_le()?;
        Ok(Self {
            hashables: OpenHashables {
                source,
                representative,
                account,
            },
            signature,
            work,
        })
    }

    fn to_json(&self) -> Value {
        json!({
            "type": "open",
            "source": self.hashables.source.encode_hex(),
            "representative": self.hashables.representative.encode_account(),
            "account": self.hashables.account.encode_account(),
            "work": work_encode_hex(self.work),
            "signature": hex::encode_upper(self.signature.as_bytes()),
        })
    }

    fn from_json(tree: &Value) -> Result<Self, ParseError> {
        let source = BlockHash::decode_hex(json_str(tree, "source")?)?;
        let representative = Account::decode_text(json_str(tree, "representative")?)?;
        let account = Account::decode_text(json_str(tree, "account")?)?;
        let work = work_decode_hex(json_str(tree, "work")?)?;
        let signature = decode_signature_hex(json_str(tree, "signature")?)?;
        Ok(Self {
            hashables: OpenHashables {
                source,
                representative,
                account,
            },
            signature,
            work,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeHashables {
    pub previous: BlockHash,
    pub representative: Account,
}

impl ChangeHashables {
    fn hash(&self, state: &mut Blake2b256) {
        Digest::update(state, self.previous.as_bytes());
        Digest::update(state, self.representative.as_bytes());
    }
}

/// Re-delegates voting weight; balance unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeBlock {
    pub hashables: ChangeHashables,
    pub signature: Ed25519Signature,
    pub work: u64,
}

impl ChangeBlock {
    pub fn new(
        previous: BlockHash,
        representative: Account,
        pair: &Ed25519Pair,
        work: u64,
    ) -> Self {
        let mut block = Self {
            hashables: ChangeHashables {
                previous,
                representative,
            },
            signature: Ed25519Signature::ZERO,
            work,
        };
        block.signature = pair.sign(block.hash().as_bytes());
        block
    }

    pub fn hash(&self) -> BlockHash {
        let mut state = Blake2b256::new();
        self.hashables.hash(&mut state);
        finalize(state)
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(32 + 32 + 64 + 8);
        out.extend_from_slice(self.hashables.previous.as_bytes());
        out.extend_from_slice(self.hashables.representative.as_bytes());
        out.extend_from_slice(self.signature.as_bytes());
        out.extend_from_slice(&self.work.to_le_bytes());
        out
    }

    fn from_reader(reader: &mut ByteReader<'_>) -> Result<Self, ParseError> {
        let previous = BlockHash(reader.read_array()?);
        let representative = Account(reader.read_array()?);
        let signature = Ed25519Signature(reader.read_array()?);
        let work = reader.read_work_le()?;
        Ok(Self {
            hashables: ChangeHashables {
                previous,
                representative,
            },
            signature,
            work,
        })
    }

    fn to_json(&self) -> Value {
        json!({
            "type": "change",
            "previous": self.hashables.previous.encode_hex(),
            "representative": self.hashables.representative.encode_account(),
            "work": work_encode_hex(self.work),
            "signature": hex::encode_upper(self.signature.as_bytes()),
        })
    }

    fn from_json(tree: &Value) -> Result<Self, ParseError> {
        let previous = BlockHash::decode_hex(json_str(tree, "previous")?)?;
        let representative = Account::decode_text(json_str(tree, "representative")?)?;
        let work = work_decode_hex(json_str(tree, "work")?)?;
        let signature = decode_signature_hex(json_str(tree, "signature")?)?;
        Ok(Self {
            hashables: ChangeHashables {
                previous,
                representative,
            },
            signature,
            work,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateHashables {
    pub account: Account,
    pub previous: BlockHash,
    pub representative: Account,
    pub balance: Amount,
    pub link: Link,
    pub token_hash: TokenType,
}

impl StateHashables {
    fn hash(&self, state: &mut Blake2b256) {
        Digest::update(state, self.account.as_bytes());
        Digest::update(state, self.previous.as_bytes());
        Digest::update(state, self.representative.as_bytes());
        Digest::update(state, self.balance.to_be_bytes());
        Digest::update(state, &self.link.0);
        Digest::update(state, self.token_hash.as_bytes());
    }
}

/// The universal block form. A send when the balance decreases, a
/// receive or open when `link` is nonzero and the balance increases, a
/// representative change when `link` is zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateBlock {
    pub hashables: StateHashables,
    pub signature: Ed25519Signature,
    pub work: u64,
}

impl StateBlock {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        account: Account,
        previous: BlockHash,
        representative: Account,
        balance: Amount,
        link: Link,
        token_hash: TokenType,
        pair: &Ed25519Pair,
        work: u64,
    ) -> Self {
        let mut block = Self {
            hashables: StateHashables {
                account,
                previous,
                representative,
                balance,
                link,
                token_hash,
            },
            signature: Ed25519Signature::ZERO,
            work,
        };
        block.signature = pair.sign(block.hash().as_bytes());
        block
    }

    pub fn hash(&self) -> BlockHash {
        let mut state = Blake2b256::new();
        Digest::update(&mut state, STATE_PREAMBLE);
        self.hashables.hash(&mut state);
        finalize(state)
    }

    pub fn token_type(&self) -> TokenType {
        self.hashables.token_hash
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(32 * 4 + 16 + 32 + 64 + 8);
        out.extend_from_slice(self.hashables.account.as_bytes());
        out.extend_from_slice(self.hashables.previous.as_bytes());
        out.extend_from_slice(self.hashables.representative.as_bytes());
        out.extend_from_slice(&self.hashables.balance.to_be_bytes());
        out.extend_from_slice(&self.hashables.link.0);
        out.extend_from_slice(self.hashables.token_hash.as_bytes());
        out.extend_from_slice(self.signature.as_bytes());
        // State-family work travels big-endian.
        out.extend_from_slice(&self.work.to_be_bytes());
        out
    }

    fn from_reader(reader: &mut ByteReader<'_>) -> Result<Self, ParseError> {
        let account = Account(reader.read_array()?);
        let previous = BlockHash(reader.read_array()?);
        let representative = Account(reader.read_array()?);
        let balance = Amount::from_be_bytes(reader.read_array()?);
        let link = Link(reader.read_array()?);
        let token_hash = BlockHash(reader.read_array()?);
        let signature = Ed25519Signature(reader.read_array()?);
        let work = reader.read_work_be()?;
        Ok(Self {
            hashables: StateHashables {
                account,
                previous,
                representative,
                balance,
                link,
                token_hash,
            },
            signature,
            work,
        })
    }

    fn to_json(&self) -> Value {
        json!({
            "type": "state",
            "account": self.hashables.account.encode_account(),
            "previous": self.hashables.previous.encode_hex(),
            "representative": self.hashables.representative.encode_account(),
            "balance": self.hashables.balance.encode_dec(),
            "link": self.hashables.link.encode_hex(),
            "link_as_account": self.hashables.link.as_account().encode_account(),
            "token": self.hashables.token_hash.encode_hex(),
            "signature": hex::encode_upper(self.signature.as_bytes()),
            "work": work_encode_hex(self.work),
        })
    }

    fn from_json(tree: &Value) -> Result<Self, ParseError> {
        let account = Account::decode_text(json_str(tree, "account")?)?;
        let previous = BlockHash::decode_hex(json_str(tree, "previous")?)?;
        let representative = Account::decode_text(json_str(tree, "representative")?)?;
        let balance = Amount::decode_dec(json_str(tree, "balance")?)?;
        let link = Link::decode_text(json_str(tree, "link")?)?;
        let token_hash = BlockHash::decode_hex(json_str(tree, "token")?)?;
        let work = work_decode_hex(json_str(tree, "work")?)?;
        let signature = decode_signature_hex(json_str(tree, "signature")?)?;
        Ok(Self {
            hashables: StateHashables {
                account,
                previous,
                representative,
                balance,
                link,
                token_hash,
            },
            signature,
            work,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmartContractHashables {
    pub sc_account: Account,
    pub sc_owner_account: Account,
    pub abi_hash: BlockHash,
    pub abi: Vec<u8>,
}

impl SmartContractHashables {
    pub fn abi_length(&self) -> Amount {
        Amount::new(self.abi.len() as u128)
    }

    /// BLAKE2b-256 over the raw ABI bytes.
    pub fn hash_abi(&self) -> BlockHash {
        BlockHash(lattice_crypto_hashes::hash256(&[&self.abi]))
    }

    // The ABI participates in the hash through abi_hash and abi_length
    // only; the body itself is pinned by abi_hash.
    fn hash(&self, state: &mut Blake2b256) {
        Digest::update(state, self.sc_account.as_bytes());
        Digest::update(state, self.sc_owner_account.as_bytes());
        Digest::update(state, self.abi_hash.as_bytes());
        Digest::update(state, self.abi_length().to_be_bytes());
    }
}

/// Registers a new token identity; has no predecessor and no chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmartContractBlock {
    pub hashables: SmartContractHashables,
    pub signature: Ed25519Signature,
    pub work: u64,
}

impl SmartContractBlock {
    pub fn new(
        sc_account: Account,
        sc_owner_account: Account,
        abi: Vec<u8>,
        pair: &Ed25519Pair,
        work: u64,
    ) -> Self {
        let mut hashables = SmartContractHashables {
            sc_account,
            sc_owner_account,
            abi_hash: BlockHash::ZERO,
            abi,
        };
        hashables.abi_hash = hashables.hash_abi();
        let mut block = Self {
            hashables,
            signature: Ed25519Signature::ZERO,
            work,
        };
        block.signature = pair.sign(block.hash().as_bytes());
        block
    }

    pub fn hash(&self) -> BlockHash {
        let mut state = Blake2b256::new();
        Digest::update(&mut state, STATE_PREAMBLE);
        self.hashables.hash(&mut state);
        finalize(state)
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(32 * 3 + 16 + self.hashables.abi.len() + 64 + 8);
        out.extend_from_slice(self.hashables.sc_account.as_bytes());
        out.extend_from_slice(self.hashables.sc_owner_account.as_bytes());
        out.extend_from_slice(self.hashables.abi_hash.as_bytes());
        out.extend_from_slice(&self.hashables.abi_length().to_be_bytes());
        out.extend_from_slice(&self.hashables.abi);
        out.extend_from_slice(self.signature.as_bytes());
        out.extend_from_slice(&self.work.to_be_bytes());
        out
    }

    fn from_reader(reader: &mut ByteReader<'_>) -> Result<Self, ParseError> {
        let sc_account = Account(reader.read_array()?);
        let sc_owner_account = Account(reader.read_array()?);
        let abi_hash = BlockHash(reader.read_array()?);
        let abi_length = Amount::from_be_bytes(reader.read_array()?);
        if abi_length.is_zero() || abi_length.raw() > u32::MAX as u128 {
            return Err(ParseError::Field("abi_length"));
        }
        let abi = reader.read_bytes(abi_length.raw() as usize)?.to_vec();
        let signature = Ed25519Signature(reader.read_array()?);
        let work = reader.read_work_be()?;
        Ok(Self {
            hashables: SmartContractHashables {
                sc_account,
                sc_owner_account,
                abi_hash,
                abi,
            },
            signature,
            work,
        })
    }

    fn to_json(&self) -> Value {
        json!({
            "type": "smart_contract",
            "internal-owned account": self.hashables.sc_account.encode_account(),
            "external-owned account": self.hashables.sc_owner_account.encode_account(),
            "abi_hash": self.hashables.abi_hash.encode_hex(),
            "abi_length": self.hashables.abi_length().encode_dec(),
            "abi": hex::encode_upper(&self.hashables.abi),
            "signature": hex::encode_upper(self.signature.as_bytes()),
            "work": work_encode_hex(self.work),
        })
    }

    fn from_json(tree: &Value) -> Result<Self, ParseError> {
        let sc_account = Account::decode_text(json_str(tree, "internal-owned account")?)?;
        let sc_owner_account = Account::decode_text(json_str(tree, "external-owned account")?)?;
        let abi_hash = BlockHash::decode_hex(json_str(tree, "abi_hash")?)?;
        let abi_length = Amount::decode_dec(json_str(tree, "abi_length")?)?;
        let abi = hex::decode(json_str(tree, "abi")?).map_err(|_| ParseError::Hex)?;
        if abi_length.raw() != abi.len() as u128 {
            return Err(ParseError::Field("abi_length"));
        }
        let work = work_decode_hex(json_str(tree, "work")?)?;
        let signature = decode_signature_hex(json_str(tree, "signature")?)?;
        Ok(Self {
            hashables: SmartContractHashables {
                sc_account,
                sc_owner_account,
                abi_hash,
                abi,
            },
            signature,
            work,
        })
    }
}

fn decode_signature_hex(text: &str) -> Result<Ed25519Signature, ParseError> {
    if text.len() != 128 {
        return Err(ParseError::Length);
    }
    let raw = hex::decode(text).map_err(|_| ParseError::Hex)?;
    Ed25519Signature::try_from(raw.as_slice()).map_err(|_| ParseError::Length)
}

/// A parsed block of any variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Send(SendBlock),
    Receive(ReceiveBlock),
    Open(OpenBlock),
    Change(ChangeBlock),
    State(StateBlock),
    SmartContract(SmartContractBlock),
}

impl Block {
    pub fn block_type(&self) -> BlockType {
        match self {
            Self::Send(_) => BlockType::Send,
            Self::Receive(_) => BlockType::Receive,
            Self::Open(_) => BlockType::Open,
            Self::Change(_) => BlockType::Change,
            Self::State(_) => BlockType::State,
            Self::SmartContract(_) => BlockType::SmartContract,
        }
    }

    pub fn hash(&self) -> BlockHash {
        match self {
            Self::Send(b) => b.hash(),
            Self::Receive(b) => b.hash(),
            Self::Open(b) => b.hash(),
            Self::Change(b) => b.hash(),
            Self::State(b) => b.hash(),
            Self::SmartContract(b) => b.hash(),
        }
    }

    /// The predecessor slot this block claims, zero for first blocks.
    pub fn previous(&self) -> BlockHash {
        match self {
            Self::Send(b) => b.hashables.previous,
            Self::Receive(b) => b.hashables.previous,
            Self::Open(_) => BlockHash::ZERO,
            Self::Change(b) => b.hashables.previous,
            Self::State(b) => b.hashables.previous,
            Self::SmartContract(_) => BlockHash::ZERO,
        }
    }

    /// The send hash a legacy block claims, zero elsewhere. State blocks
    /// always answer zero here; their `link` carries the source.
    pub fn source(&self) -> BlockHash {
        match self {
            Self::Receive(b) => b.hashables.source,
            Self::Open(b) => b.hashables.source,
            _ => BlockHash::ZERO,
        }
    }

    /// The position this block contests: `previous` when nonzero, the
    /// account for first blocks. The work nonce is evaluated over this.
    pub fn root(&self) -> BlockHash {
        match self {
            Self::Send(b) => b.hashables.previous,
            Self::Receive(b) => b.hashables.previous,
            Self::Change(b) => b.hashables.previous,
            Self::Open(b) => BlockHash(b.hashables.account.0),
            Self::State(b) => {
                if !b.hashables.previous.is_zero() {
                    b.hashables.previous
                } else {
                    BlockHash(b.hashables.account.0)
                }
            }
            Self::SmartContract(_) => BlockHash::ZERO,
        }
    }

    /// The representative named by this block, zero for variants that
    /// cannot re-delegate.
    pub fn representative(&self) -> Account {
        match self {
            Self::Open(b) => b.hashables.representative,
            Self::Change(b) => b.hashables.representative,
            Self::State(b) => b.hashables.representative,
            _ => Account::ZERO,
        }
    }

    pub fn block_signature(&self) -> &Ed25519Signature {
        match self {
            Self::Send(b) => &b.signature,
            Self::Receive(b) => &b.signature,
            Self::Open(b) => &b.signature,
            Self::Change(b) => &b.signature,
            Self::State(b) => &b.signature,
            Self::SmartContract(b) => &b.signature,
        }
    }

    pub fn work(&self) -> u64 {
        match self {
            Self::Send(b) => b.work,
            Self::Receive(b) => b.work,
            Self::Open(b) => b.work,
            Self::Change(b) => b.work,
            Self::State(b) => b.work,
            Self::SmartContract(b) => b.work,
        }
    }

    /// Whether a block of this variant may follow a block of type
    /// `predecessor`. Legacy variants only chain on legacy predecessors;
    /// the state family accepts any.
    pub fn valid_predecessor(&self, predecessor: BlockType) -> bool {
        match self {
            Self::Send(_) | Self::Receive(_) | Self::Change(_) => matches!(
                predecessor,
                BlockType::Send | BlockType::Receive | BlockType::Open | BlockType::Change
            ),
            Self::Open(_) => false,
            Self::State(_) | Self::SmartContract(_) => true,
        }
    }

    /// Wire form: one type byte followed by the body layout of the
    /// variant.
    pub fn serialize(&self) -> Vec<u8> {
        let body = match self {
            Self::Send(b) => b.to_bytes(),
            Self::Receive(b) => b.to_bytes(),
            Self::Open(b) => b.to_bytes(),
            Self::Change(b) => b.to_bytes(),
            Self::State(b) => b.to_bytes(),
            Self::SmartContract(b) => b.to_bytes(),
        };
        let mut out = Vec::with_capacity(1 + body.len());
        out.push(self.block_type().as_u8());
        out.extend_from_slice(&body);
        out
    }

    /// Parse a wire-form block, returning it and the number of bytes
    /// consumed (trailing bytes are left for the caller).
    pub fn deserialize(buf: &[u8]) -> Result<(Self, usize), ParseError> {
        let mut reader = ByteReader::new(buf);
        let type_byte = reader.read_array::<1>()?[0];
        let block_type = BlockType::from_u8(type_byte).ok_or(ParseError::UnknownBlockType)?;
        let block = match block_type {
            BlockType::Send => Self::Send(SendBlock::from_reader(&mut reader)?),
            BlockType::Receive => Self::Receive(ReceiveBlock::from_reader(&mut reader)?),
            BlockType::Open => Self::Open(OpenBlock::from_reader(&mut reader)?),
            BlockType::Change => Self::Change(ChangeBlock::from_reader(&mut reader)?),
            BlockType::State => Self::State(StateBlock::from_reader(&mut reader)?),
            BlockType::SmartContract => {
                Self::SmartContract(SmartContractBlock::from_reader(&mut reader)?)
            }
            BlockType::Invalid | BlockType::NotABlock => {
                return Err(ParseError::UnknownBlockType)
            }
        };
        Ok((block, reader.consumed()))
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Send(b) => b.to_json(),
            Self::Receive(b) => b.to_json(),
            Self::Open(b) => b.to_json(),
            Self::Change(b) => b.to_json(),
            Self::State(b) => b.to_json(),
            Self::SmartContract(b) => b.to_json(),
        }
    }

    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }

    pub fn from_json(tree: &Value) -> Result<Self, ParseError> {
        match json_str(tree, "type")? {
            "send" => SendBlock::from_json(tree).map(Self::Send),
            "receive" => ReceiveBlock::from_json(tree).map(Self::Receive),
            "open" => OpenBlock::from_json(tree).map(Self::Open),
            "change" => ChangeBlock::from_json(tree).map(Self::Change),
            "state" => StateBlock::from_json(tree).map(Self::State),
            "smart_contract" => SmartContractBlock::from_json(tree).map(Self::SmartContract),
            _ => Err(ParseError::UnknownBlockType),
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, ParseError> {
        let tree: Value =
            serde_json::from_str(text).map_err(|_| ParseError::Field("json"))?;
        Self::from_json(&tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::CHAIN_TOKEN;
    use lattice_crypto_keys::Ed25519Pair;

    fn make_test_keypair() -> Ed25519Pair {
        Ed25519Pair::from_seed(&[42u8; 32])
    }

    fn make_send() -> SendBlock {
        SendBlock::new(
            BlockHash::from_bytes([1u8; 32]),
            Account::from_bytes([2u8; 32]),
            Amount::new(1000),
            &make_test_keypair(),
            0x1234,
        )
    }

    fn make_state() -> StateBlock {
        StateBlock::new(
            Account::from(make_test_keypair().public_key()),
            BlockHash::from_bytes([3u8; 32]),
            Account::from_bytes([4u8; 32]),
            Amount::new(777),
            Link([5u8; 32]),
            CHAIN_TOKEN,
            &make_test_keypair(),
            0x99,
        )
    }

    #[test]
    fn test_hash_is_deterministic() {
        let block = make_send();
        assert_eq!(block.hash(), block.hash());
    }

    #[test]
    fn test_hash_covers_every_field() {
        let base = make_send();
        let mut other = base.clone();
        other.hashables.balance = Amount::new(1001);
        assert_ne!(base.hash(), other.hash());

        let mut other = base.clone();
        other.hashables.destination = Account::from_bytes([9u8; 32]);
        assert_ne!(base.hash(), other.hash());

        let mut other = base.clone();
        other.hashables.previous = BlockHash::from_bytes([9u8; 32]);
        assert_ne!(base.hash(), other.hash());
    }

    #[test]
    fn test_signature_verifies_over_hash() {
        let pair = make_test_keypair();
        let block = make_send();
        assert!(pair
            .public_key()
            .verify(block.hash().as_bytes(), &block.signature)
            .is_ok());
    }

    #[test]
    fn test_state_preamble_distinguishes_hash() {
        // A state block and a hand-fed legacy hash over the same bytes
        // must differ because of the preamble.
        let state = make_state();
        let mut no_preamble = Blake2b256::new();
        state.hashables.hash(&mut no_preamble);
        assert_ne!(state.hash(), finalize(no_preamble));
    }

    #[test]
    fn test_state_hash_covers_token() {
        let base = make_state();
        let mut other = base.clone();
        other.hashables.token_hash = BlockHash::from_bytes([8u8; 32]);
        assert_ne!(base.hash(), other.hash());
    }

    #[test]
    fn test_send_wire_roundtrip() {
        let block = Block::Send(make_send());
        let bytes = block.serialize();
        // type ‖ previous ‖ destination ‖ balance ‖ signature ‖ work
        assert_eq!(bytes.len(), 1 + 32 + 32 + 16 + 64 + 8);
        let (parsed, consumed) = Block::deserialize(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(parsed, block);
    }

    #[test]
    fn test_receive_wire_roundtrip() {
        let pair = make_test_keypair();
        let block = Block::Receive(ReceiveBlock::new(
            BlockHash::from_bytes([1u8; 32]),
            BlockHash::from_bytes([2u8; 32]),
            &pair,
            7,
        ));
        let bytes = block.serialize();
        assert_eq!(bytes.len(), 1 + 32 + 32 + 64 + 8);
        let (parsed, _) = Block::deserialize(&bytes).unwrap();
        assert_eq!(parsed, block);
    }

    #[test]
    fn test_open_wire_roundtrip() {
        let pair = make_test_keypair();
        let block = Block::Open(OpenBlock::new(
            BlockHash::from_bytes([1u8; 32]),
            Account::from_bytes([2u8; 32]),
            Account::from(pair.public_key()),
            &pair,
            7,
        ));
        let bytes = block.serialize();
        assert_eq!(bytes.len(), 1 + 32 + 32 + 32 + 64 + 8);
        let (parsed, _) = Block::deserialize(&bytes).unwrap();
        assert_eq!(parsed, block);
    }

    #[test]
    fn test_change_wire_roundtrip() {
        let pair = make_test_keypair();
        let block = Block::Change(ChangeBlock::new(
            BlockHash::from_bytes([1u8; 32]),
            Account::from_bytes([2u8; 32]),
            &pair,
            7,
        ));
        let bytes = block.serialize();
        assert_eq!(bytes.len(), 1 + 32 + 32 + 64 + 8);
        let (parsed, _) = Block::deserialize(&bytes).unwrap();
        assert_eq!(parsed, block);
    }

    #[test]
    fn test_state_wire_roundtrip_and_work_endianness() {
        let block = make_state();
        let bytes = Block::State(block.clone()).serialize();
        assert_eq!(bytes.len(), 1 + 32 + 32 + 32 + 16 + 32 + 32 + 64 + 8);
        // Work is the trailing 8 bytes, big-endian.
        assert_eq!(
            u64::from_be_bytes(bytes[bytes.len() - 8..].try_into().unwrap()),
            block.work
        );
        let (parsed, _) = Block::deserialize(&bytes).unwrap();
        assert_eq!(parsed, Block::State(block));
    }

    #[test]
    fn test_legacy_work_is_little_endian_on_wire() {
        let block = make_send();
        let bytes = Block::Send(block.clone()).serialize();
        assert_eq!(
            u64::from_le_bytes(bytes[bytes.len() - 8..].try_into().unwrap()),
            block.work
        );
    }

    #[test]
    fn test_smart_contract_wire_roundtrip() {
        let pair = make_test_keypair();
        let block = Block::SmartContract(SmartContractBlock::new(
            Account::from(pair.public_key()),
            Account::from_bytes([2u8; 32]),
            b"fn transfer(to, amount)".to_vec(),
            &pair,
            7,
        ));
        let bytes = block.serialize();
        let (parsed, consumed) = Block::deserialize(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(parsed, block);
    }

    #[test]
    fn test_smart_contract_abi_hash_binds_abi() {
        let pair = make_test_keypair();
        let block = SmartContractBlock::new(
            Account::from(pair.public_key()),
            Account::from_bytes([2u8; 32]),
            b"abi".to_vec(),
            &pair,
            0,
        );
        assert_eq!(block.hashables.abi_hash, block.hashables.hash_abi());
        let mut tampered = block.clone();
        tampered.hashables.abi = b"ab!".to_vec();
        assert_ne!(tampered.hashables.abi_hash, tampered.hashables.hash_abi());
    }

    #[test]
    fn test_truncated_wire_rejected() {
        let bytes = Block::Send(make_send()).serialize();
        assert_eq!(
            Block::deserialize(&bytes[..bytes.len() - 1]),
            Err(ParseError::Truncated)
        );
        assert_eq!(Block::deserialize(&[]), Err(ParseError::Truncated));
        assert_eq!(Block::deserialize(&[99]), Err(ParseError::UnknownBlockType));
    }

    #[test]
    fn test_json_roundtrip_all_variants() {
        let pair = make_test_keypair();
        let blocks = vec![
            Block::Send(make_send()),
            Block::Receive(ReceiveBlock::new(
                BlockHash::from_bytes([1u8; 32]),
                BlockHash::from_bytes([2u8; 32]),
                &pair,
                7,
            )),
            Block::Open(OpenBlock::new(
                BlockHash::from_bytes([1u8; 32]),
                Account::from_bytes([2u8; 32]),
                Account::from(pair.public_key()),
                &pair,
                7,
            )),
            Block::Change(ChangeBlock::new(
                BlockHash::from_bytes([1u8; 32]),
                Account::from_bytes([2u8; 32]),
                &pair,
                7,
            )),
            Block::State(make_state()),
            Block::SmartContract(SmartContractBlock::new(
                Account::from(pair.public_key()),
                Account::from_bytes([2u8; 32]),
                b"abi".to_vec(),
                &pair,
                7,
            )),
        ];
        for block in blocks {
            let text = block.to_json_string();
            let parsed = Block::from_json_str(&text).unwrap();
            assert_eq!(parsed, block, "json roundtrip failed for {:?}", block.block_type());
            // Hash must survive the roundtrip in particular.
            assert_eq!(parsed.hash(), block.hash());
        }
    }

    #[test]
    fn test_state_json_fields() {
        let block = make_state();
        let tree = block.to_json();
        assert_eq!(tree["type"], "state");
        assert_eq!(tree["balance"], block.hashables.balance.encode_dec());
        assert_eq!(
            tree["link_as_account"],
            block.hashables.link.as_account().encode_account()
        );
        // Link decodes from the account form as well.
        let mut patched = tree.clone();
        patched["link"] = tree["link_as_account"].clone();
        let parsed = Block::from_json(&patched).unwrap();
        assert_eq!(parsed.hash(), block.hash());
    }

    #[test]
    fn test_valid_predecessor_rules() {
        let pair = make_test_keypair();
        let send = Block::Send(make_send());
        let open = Block::Open(OpenBlock::new(
            BlockHash::from_bytes([1u8; 32]),
            Account::from_bytes([2u8; 32]),
            Account::from(pair.public_key()),
            &pair,
            7,
        ));
        let state = Block::State(make_state());

        for legacy in [
            BlockType::Send,
            BlockType::Receive,
            BlockType::Open,
            BlockType::Change,
        ] {
            assert!(send.valid_predecessor(legacy));
        }
        assert!(!send.valid_predecessor(BlockType::State));
        assert!(!open.valid_predecessor(BlockType::Send));
        assert!(state.valid_predecessor(BlockType::State));
        assert!(state.valid_predecessor(BlockType::Send));
    }

    #[test]
    fn test_root_rules() {
        let state = make_state();
        assert_eq!(Block::State(state.clone()).root(), state.hashables.previous);

        let pair = make_test_keypair();
        let open_state = StateBlock::new(
            Account::from(pair.public_key()),
            BlockHash::ZERO,
            Account::from_bytes([4u8; 32]),
            Amount::new(1),
            Link([5u8; 32]),
            CHAIN_TOKEN,
            &pair,
            0,
        );
        assert_eq!(
            Block::State(open_state.clone()).root(),
            BlockHash(open_state.hashables.account.0)
        );

        let open = OpenBlock::new(
            BlockHash::from_bytes([1u8; 32]),
            Account::from_bytes([2u8; 32]),
            Account::from(pair.public_key()),
            &pair,
            7,
        );
        assert_eq!(Block::Open(open.clone()).root(), BlockHash(open.hashables.account.0));
    }
}
