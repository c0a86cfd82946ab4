// Copyright (c) 2024 The Lattice Project

//! Ed25519 key and signature types.
//!
//! Thin wrappers over `ed25519-dalek` with fixed-size byte conversions,
//! so the rest of the workspace never touches the dalek API directly.

use ed25519_dalek::{Signer, Verifier};
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from parsing or using key material.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("wrong length: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("bytes do not encode a valid curve point")]
    InvalidPublicKey,

    #[error("signature verification failed")]
    SignatureMismatch,
}

/// An Ed25519 public key (a validated curve point).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ed25519Public(ed25519_dalek::VerifyingKey);

impl Ed25519Public {
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, KeyError> {
        ed25519_dalek::VerifyingKey::from_bytes(bytes)
            .map(Self)
            .map_err(|_| KeyError::InvalidPublicKey)
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Verify `signature` over `message` with this key.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<(), KeyError> {
        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
        self.0
            .verify(message, &sig)
            .map_err(|_| KeyError::SignatureMismatch)
    }
}

impl TryFrom<&[u8]> for Ed25519Public {
    type Error = KeyError;

    fn try_from(bytes: &[u8]) -> Result<Self, KeyError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| KeyError::LengthMismatch {
            expected: 32,
            actual: bytes.len(),
        })?;
        Self::from_bytes(&arr)
    }
}

/// An Ed25519 private key.
#[derive(Clone)]
pub struct Ed25519Private(ed25519_dalek::SigningKey);

impl Ed25519Private {
    /// Construct from a 32-byte seed. Any seed is a valid private key.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(bytes))
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    pub fn public_key(&self) -> Ed25519Public {
        Ed25519Public(self.0.verifying_key())
    }

    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        Ed25519Signature(self.0.sign(message).to_bytes())
    }
}

impl TryFrom<&[u8]> for Ed25519Private {
    type Error = KeyError;

    fn try_from(bytes: &[u8]) -> Result<Self, KeyError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| KeyError::LengthMismatch {
            expected: 32,
            actual: bytes.len(),
        })?;
        Ok(Self::from_bytes(&arr))
    }
}

/// An Ed25519 keypair.
#[derive(Clone)]
pub struct Ed25519Pair {
    private: Ed25519Private,
    public: Ed25519Public,
}

impl Ed25519Pair {
    pub fn new(private: Ed25519Private) -> Self {
        let public = private.public_key();
        Self { private, public }
    }

    /// Generate a keypair from a cryptographic RNG.
    pub fn from_random(rng: &mut impl CryptoRngCore) -> Self {
        Self::new(Ed25519Private(ed25519_dalek::SigningKey::generate(rng)))
    }

    /// Derive a keypair from a fixed 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::new(Ed25519Private::from_bytes(seed))
    }

    pub fn public_key(&self) -> Ed25519Public {
        self.public
    }

    pub fn private_key(&self) -> &Ed25519Private {
        &self.private
    }

    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        self.private.sign(message)
    }
}

/// An Ed25519 signature in byte form.
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct Ed25519Signature(#[serde(with = "serde_bytes_64")] pub [u8; 64]);

impl Ed25519Signature {
    pub const ZERO: Self = Self([0u8; 64]);

    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(&self) -> [u8; 64] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl PartialEq for Ed25519Signature {
    fn eq(&self, other: &Self) -> bool {
        self.0[..] == other.0[..]
    }
}

impl Eq for Ed25519Signature {}

impl std::fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519Signature({:02x?}..)", &self.0[..4])
    }
}

impl TryFrom<&[u8]> for Ed25519Signature {
    type Error = KeyError;

    fn try_from(bytes: &[u8]) -> Result<Self, KeyError> {
        let arr: [u8; 64] = bytes.try_into().map_err(|_| KeyError::LengthMismatch {
            expected: 64,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

// serde support for the 64-byte signature array, which serde does not
// derive for arrays past 32 elements.
mod serde_bytes_64 {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 64], D::Error> {
        let v: Vec<u8> = Vec::deserialize(deserializer)?;
        v.as_slice()
            .try_into()
            .map_err(|_| D::Error::custom("expected 64 bytes"))
    }
}
