// Copyright (c) 2024 The Lattice Project

//! BLAKE2b hashing primitives.
//!
//! Everything consensus-critical in the ledger hashes with BLAKE2b: block
//! hashes and ABI digests use the 32-byte form, account-string checksums
//! use the 5-byte form.

pub use blake2::digest::{self, Digest};

use blake2::digest::consts::U32;
use blake2::digest::{Update, VariableOutput};
use blake2::{Blake2b, Blake2bVar};

/// BLAKE2b with a 256-bit output, the ledger's block digest.
pub type Blake2b256 = Blake2b<U32>;

/// Length of an account-string checksum in bytes.
pub const ACCOUNT_CHECKSUM_LEN: usize = 5;

/// BLAKE2b-256 over a sequence of byte slices, concatenated.
pub fn hash256(parts: &[&[u8]]) -> [u8; 32] {
    let mut state = Blake2b256::new();
    for part in parts {
        Digest::update(&mut state, part);
    }
    state.finalize().into()
}

/// BLAKE2b with an 8-byte output, as used by the work difficulty test.
pub fn hash64(parts: &[&[u8]]) -> [u8; 8] {
    let mut state = Blake2bVar::new(8).expect("8 is a valid blake2b output length");
    for part in parts {
        state.update(part);
    }
    let mut out = [0u8; 8];
    state
        .finalize_variable(&mut out)
        .expect("output buffer matches configured length");
    out
}

/// The 5-byte BLAKE2b checksum appended to textual account encodings.
pub fn account_checksum(bytes: &[u8]) -> [u8; ACCOUNT_CHECKSUM_LEN] {
    let mut state =
        Blake2bVar::new(ACCOUNT_CHECKSUM_LEN).expect("5 is a valid blake2b output length");
    state.update(bytes);
    let mut out = [0u8; ACCOUNT_CHECKSUM_LEN];
    state
        .finalize_variable(&mut out)
        .expect("output buffer matches configured length");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash32_empty_vector() {
        // Known BLAKE2b-256 digest of the empty message.
        let expected =
            hex::decode("0e5751c026e543b2e8ab2eb06099daa1d1e5df47778f7787faab45cdf12fe3a8")
                .unwrap();
        assert_eq!(hash256(&[]).to_vec(), expected);
        assert_eq!(hash256(&[b""]).to_vec(), expected);
    }

    #[test]
    fn test_hash32_concatenation() {
        // Hashing split slices must equal hashing the concatenation.
        let joined = hash256(&[b"lattice ledger"]);
        let split = hash256(&[b"lattice ", b"ledger"]);
        assert_eq!(joined, split);
    }

    #[test]
    fn test_hash32_distinct_inputs() {
        assert_ne!(hash256(&[b"a"]), hash256(&[b"b"]));
    }

    #[test]
    fn test_account_checksum_deterministic() {
        let a = account_checksum(&[7u8; 32]);
        let b = account_checksum(&[7u8; 32]);
        assert_eq!(a, b);
        assert_ne!(a, account_checksum(&[8u8; 32]));
    }
}
