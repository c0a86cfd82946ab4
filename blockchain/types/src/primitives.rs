// Copyright (c) 2024 The Lattice Project

//! Fixed-width primitive types and their textual codecs.

use std::fmt;

use lattice_crypto_hashes::account_checksum;
use lattice_crypto_keys::{Ed25519Public, KeyError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from decoding textual or wire forms.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("wrong length")]
    Length,

    #[error("invalid hex")]
    Hex,

    #[error("invalid decimal")]
    Decimal,

    #[error("invalid base58")]
    Base58,

    #[error("account checksum mismatch")]
    Checksum,

    #[error("truncated input")]
    Truncated,

    #[error("unknown block type")]
    UnknownBlockType,

    #[error("missing or malformed field: {0}")]
    Field(&'static str),
}

impl From<hex::FromHexError> for ParseError {
    fn from(_: hex::FromHexError) -> Self {
        ParseError::Hex
    }
}

fn decode_hex_32(text: &str) -> Result<[u8; 32], ParseError> {
    if text.len() != 64 {
        return Err(ParseError::Length);
    }
    let raw = hex::decode(text)?;
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&raw);
    Ok(bytes)
}

/// A 128-bit unsigned amount, big-endian in canonical byte form.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(u128::MAX);

    pub const fn new(raw: u128) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u128 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn to_be_bytes(&self) -> [u8; 16] {
        self.0.to_be_bytes()
    }

    pub fn from_be_bytes(bytes: [u8; 16]) -> Self {
        Self(u128::from_be_bytes(bytes))
    }

    pub fn checked_add(&self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(&self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    pub fn saturating_add(&self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }

    /// Magnitude of the difference between two amounts.
    pub fn abs_diff(&self, other: Amount) -> Amount {
        Amount(self.0.abs_diff(other.0))
    }

    /// Modular addition, used by the vote-weight accumulators.
    pub fn wrapping_add(&self, other: Amount) -> Amount {
        Amount(self.0.wrapping_add(other.0))
    }

    /// Modular subtraction, used by the vote-weight accumulators.
    pub fn wrapping_sub(&self, other: Amount) -> Amount {
        Amount(self.0.wrapping_sub(other.0))
    }

    /// Canonical 32-digit uppercase hex, the legacy-block balance form.
    pub fn encode_hex(&self) -> String {
        format!("{:032X}", self.0)
    }

    pub fn decode_hex(text: &str) -> Result<Self, ParseError> {
        if text.is_empty() || text.len() > 32 {
            return Err(ParseError::Length);
        }
        u128::from_str_radix(text, 16)
            .map(Amount)
            .map_err(|_| ParseError::Hex)
    }

    /// Decimal form, the state-block balance form.
    pub fn encode_dec(&self) -> String {
        self.0.to_string()
    }

    pub fn decode_dec(text: &str) -> Result<Self, ParseError> {
        if text.is_empty() || text.len() > 39 {
            return Err(ParseError::Length);
        }
        text.parse::<u128>().map(Amount).map_err(|_| ParseError::Decimal)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 256-bit BLAKE2b block digest.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
)]
pub struct BlockHash(pub [u8; 32]);

impl BlockHash {
    pub const ZERO: Self = Self([0u8; 32]);

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn encode_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    pub fn decode_hex(text: &str) -> Result<Self, ParseError> {
        decode_hex_32(text).map(Self)
    }
}

impl std::ops::BitXor for BlockHash {
    type Output = BlockHash;

    fn bitxor(self, rhs: BlockHash) -> BlockHash {
        let mut out = [0u8; 32];
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = self.0[i] ^ rhs.0[i];
        }
        BlockHash(out)
    }
}

impl std::ops::BitXorAssign for BlockHash {
    fn bitxor_assign(&mut self, rhs: BlockHash) {
        *self = *self ^ rhs;
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode_hex())
    }
}

/// A token identity: the hash of the smart-contract block that registered
/// it, or [`CHAIN_TOKEN`] for the native token.
pub type TokenType = BlockHash;

/// The native token of the chain.
pub const CHAIN_TOKEN: TokenType = BlockHash::ZERO;

/// A 256-bit account identifier (an Ed25519 public key).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
)]
pub struct Account(pub [u8; 32]);

/// The burn account. It can never be opened; credits sent here are
/// destroyed.
pub const BURN_ACCOUNT: Account = Account([0u8; 32]);

// Base58 with the alphabet offset one character from the conventional
// ordering; the trailing digit doubles as the padding sentinel.
static ACCOUNT_ALPHABET: bs58::Alphabet = bs58::Alphabet::new_unwrap(
    b"23456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz1",
);

impl Account {
    pub const ZERO: Self = Self([0u8; 32]);

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Interpret the account as a verifying key. Fails for byte strings
    /// that are not curve points (notably the burn account).
    pub fn to_public(&self) -> Result<Ed25519Public, KeyError> {
        Ed25519Public::from_bytes(&self.0)
    }

    /// Textual account form: base58 over the key bytes followed by a
    /// 5-byte BLAKE2b checksum.
    pub fn encode_account(&self) -> String {
        let check = account_checksum(&self.0);
        let mut payload = [0u8; 37];
        payload[..32].copy_from_slice(&self.0);
        // Checksum appended least-significant-first.
        for (i, byte) in check.iter().enumerate() {
            payload[36 - i] = *byte;
        }
        bs58::encode(&payload)
            .with_alphabet(&ACCOUNT_ALPHABET)
            .into_string()
    }

    pub fn decode_account(text: &str) -> Result<Self, ParseError> {
        let raw = bs58::decode(text)
            .with_alphabet(&ACCOUNT_ALPHABET)
            .into_vec()
            .map_err(|_| ParseError::Base58)?;
        if raw.len() > 37 {
            return Err(ParseError::Length);
        }
        let mut payload = [0u8; 37];
        payload[37 - raw.len()..].copy_from_slice(&raw);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&payload[..32]);
        let check = account_checksum(&bytes);
        for (i, byte) in check.iter().enumerate() {
            if payload[36 - i] != *byte {
                return Err(ParseError::Checksum);
            }
        }
        Ok(Self(bytes))
    }

    pub fn encode_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    pub fn decode_hex(text: &str) -> Result<Self, ParseError> {
        decode_hex_32(text).map(Self)
    }

    /// Decode either textual form, account first.
    pub fn decode_text(text: &str) -> Result<Self, ParseError> {
        Self::decode_account(text).or_else(|_| Self::decode_hex(text))
    }
}

impl From<Ed25519Public> for Account {
    fn from(key: Ed25519Public) -> Self {
        Self(key.to_bytes())
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode_account())
    }
}

/// A 256-bit value whose meaning depends on context: the source hash of a
/// state receive, the destination account of a state send, or nothing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
pub struct Link(pub [u8; 32]);

impl Link {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub const fn as_account(&self) -> Account {
        Account(self.0)
    }

    pub const fn as_block_hash(&self) -> BlockHash {
        BlockHash(self.0)
    }

    pub fn encode_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    /// Decoders accept both the account and the hex form.
    pub fn decode_text(text: &str) -> Result<Self, ParseError> {
        if let Ok(account) = Account::decode_account(text) {
            return Ok(Self(account.0));
        }
        decode_hex_32(text).map(Self)
    }
}

impl From<Account> for Link {
    fn from(account: Account) -> Self {
        Self(account.0)
    }
}

impl From<BlockHash> for Link {
    fn from(hash: BlockHash) -> Self {
        Self(hash.0)
    }
}

/// A 64-bit work nonce in its textual form.
pub fn work_encode_hex(work: u64) -> String {
    format!("{:016x}", work)
}

pub fn work_decode_hex(text: &str) -> Result<u64, ParseError> {
    if text.is_empty() || text.len() > 16 {
        return Err(ParseError::Length);
    }
    u64::from_str_radix(text, 16).map_err(|_| ParseError::Hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_hex_roundtrip() {
        let amount = Amount::new(0xDEAD_BEEF_0000_0001);
        assert_eq!(Amount::decode_hex(&amount.encode_hex()).unwrap(), amount);
        assert_eq!(amount.encode_hex().len(), 32);
        assert_eq!(
            Amount::MAX.encode_hex(),
            "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF"
        );
    }

    #[test]
    fn test_amount_dec_roundtrip() {
        let amount = Amount::new(340_282_366_920_938_463_463);
        assert_eq!(Amount::decode_dec(&amount.encode_dec()).unwrap(), amount);
        assert!(Amount::decode_dec("not a number").is_err());
        assert!(Amount::decode_dec("").is_err());
    }

    #[test]
    fn test_amount_be_bytes() {
        let amount = Amount::new(0x0102);
        let bytes = amount.to_be_bytes();
        assert_eq!(bytes[14], 0x01);
        assert_eq!(bytes[15], 0x02);
        assert_eq!(Amount::from_be_bytes(bytes), amount);
    }

    #[test]
    fn test_block_hash_hex_roundtrip() {
        let hash = BlockHash::from_bytes([0xAB; 32]);
        assert_eq!(BlockHash::decode_hex(&hash.encode_hex()).unwrap(), hash);
        assert!(BlockHash::decode_hex("AB").is_err());
        assert!(BlockHash::decode_hex(&"G".repeat(64)).is_err());
    }

    #[test]
    fn test_block_hash_xor() {
        let a = BlockHash::from_bytes([0xF0; 32]);
        let b = BlockHash::from_bytes([0x0F; 32]);
        assert_eq!(a ^ b, BlockHash::from_bytes([0xFF; 32]));
        let mut c = a;
        c ^= a;
        assert_eq!(c, BlockHash::ZERO);
    }

    #[test]
    fn test_account_encode_roundtrip() {
        let account = Account::from_bytes([0x5A; 32]);
        let text = account.encode_account();
        assert_eq!(Account::decode_account(&text).unwrap(), account);
        // Hex form is accepted too.
        assert_eq!(Account::decode_text(&account.encode_hex()).unwrap(), account);
    }

    #[test]
    fn test_account_checksum_detects_corruption() {
        let account = Account::from_bytes([0x5A; 32]);
        let mut text = account.encode_account();
        // Flip one character to another alphabet character.
        let replacement = if text.ends_with('3') { '4' } else { '3' };
        text.pop();
        text.push(replacement);
        assert!(matches!(
            Account::decode_account(&text),
            Err(ParseError::Checksum) | Err(ParseError::Length)
        ));
    }

    #[test]
    fn test_burn_account_roundtrip() {
        let text = BURN_ACCOUNT.encode_account();
        assert_eq!(Account::decode_account(&text).unwrap(), BURN_ACCOUNT);
        assert!(BURN_ACCOUNT.is_zero());
    }

    #[test]
    fn test_link_decodes_both_forms() {
        let account = Account::from_bytes([0x11; 32]);
        let as_account = Link::decode_text(&account.encode_account()).unwrap();
        let as_hex = Link::decode_text(&account.encode_hex()).unwrap();
        assert_eq!(as_account, as_hex);
        assert_eq!(as_account.as_account(), account);
    }

    #[test]
    fn test_work_hex_roundtrip() {
        assert_eq!(work_decode_hex(&work_encode_hex(42)).unwrap(), 42);
        assert_eq!(work_encode_hex(42).len(), 16);
        assert!(work_decode_hex("12345678901234567").is_err());
    }
}
