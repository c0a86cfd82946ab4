// Copyright (c) 2024 The Lattice Project

//! The work-difficulty predicate.
//!
//! A block's work nonce is evaluated over its root (the predecessor slot
//! it contests, or the account for first blocks). The ledger core only
//! consumes the verdict; generating nonces is the job of an external work
//! oracle.

use lattice_crypto_hashes::hash64;

use crate::primitives::BlockHash;

/// Difficulty floor on production networks.
pub const MAIN_WORK_THRESHOLD: u64 = 0xffff_ffc0_0000_0000;

/// Difficulty floor on test networks, cheap enough to grind in tests.
pub const TEST_WORK_THRESHOLD: u64 = 0xff00_0000_0000_0000;

/// The scalar a (root, nonce) pair hashes to; valid when at or above the
/// network threshold.
pub fn work_value(root: &BlockHash, work: u64) -> u64 {
    let digest = hash64(&[&work.to_le_bytes(), root.as_bytes()]);
    u64::from_le_bytes(digest)
}

pub fn work_valid(root: &BlockHash, work: u64, threshold: u64) -> bool {
    work_value(root, work) >= threshold
}

/// Grind a valid nonce by iteration. Test-grade oracle; production nodes
/// use a dedicated work service.
pub fn work_generate(root: &BlockHash, threshold: u64) -> u64 {
    let mut work = 0u64;
    while !work_valid(root, work, threshold) {
        work = work.wrapping_add(1);
    }
    work
}
