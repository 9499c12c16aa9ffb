// Hash-critical. Any change here invalidates previously published hashes.
//! Canonical protocol types for attest v1.
//!
//! This module defines all hash-visible data structures and primitive value
//! types used across the log, state, and storage layers. Field order in
//! [`ConfigEntry`] is canonical: Borsh serializes in declaration order, and
//! every entry hash ever produced depends on it.

use crate::constants::*;
use borsh::{BorshDeserialize, BorshSerialize};
use core::fmt;
use core::str::FromStr;

/// Errors related to parsing, validation, or construction of core types.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Hex string had an unexpected byte length.
    #[error("invalid hex length: expected {expected} bytes, got {got} bytes")]
    InvalidHexLength {
        /// Expected number of bytes.
        expected: usize,
        /// Actual number of bytes provided.
        got: usize,
    },

    /// Hex decoding failed.
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// A value violated protocol constraints.
    #[error("invalid value: {0}")]
    InvalidValue(&'static str),

    /// Canonical serialization or deserialization failed.
    #[error("codec error: {0}")]
    Codec(&'static str),
}

/// Fixed-size 32-byte digest used throughout the protocol.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, BorshSerialize, BorshDeserialize)]
pub struct Hash32(pub [u8; HASH32_LEN]);

impl Hash32 {
    /// Returns an all-zero digest.
    ///
    /// The zero digest doubles as the "empty" sentinel: a genesis entry's
    /// `prev_hash`, and the cleared `entry_hash` during canonical hashing.
    pub const fn zero() -> Self {
        Self([0u8; HASH32_LEN])
    }

    /// Returns the underlying byte array.
    pub const fn as_bytes(&self) -> &[u8; HASH32_LEN] {
        &self.0
    }

    /// Returns whether this is the all-zero (empty) digest.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH32_LEN]
    }
}

impl fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash32({})", hex::encode(self.0))
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl From<[u8; HASH32_LEN]> for Hash32 {
    fn from(value: [u8; HASH32_LEN]) -> Self {
        Self(value)
    }
}

impl From<Hash32> for [u8; HASH32_LEN] {
    fn from(value: Hash32) -> Self {
        value.0
    }
}

impl FromStr for Hash32 {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        if bytes.len() != HASH32_LEN {
            return Err(CoreError::InvalidHexLength {
                expected: HASH32_LEN,
                got: bytes.len(),
            });
        }
        let mut arr = [0u8; HASH32_LEN];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

/// Mutation kind carried by a [`ConfigEntry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum Operation {
    /// Assign `value_digest` to `key`.
    Set,
    /// Remove `key`; idempotent when the key is absent.
    Delete,
}

/// The atomic unit of log mutation.
///
/// Invariants over an accepted sequence `L[0..n)`:
/// - `L[i].index == i`
/// - `L[0].prev_hash` is zero; `L[i].prev_hash == L[i-1].entry_hash` for `i > 0`
/// - `entry_hash` is the SHA-256 of the canonical encoding with `entry_hash`
///   and `signature` cleared
/// - `signature` is a valid Ed25519 signature by `author_id`'s registered key
///   over exactly the `entry_hash` bytes
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ConfigEntry {
    /// Position in the log, zero-based, strictly sequential.
    pub index: u64,
    /// Author-supplied wall-clock time in nanoseconds. Informational only;
    /// never validated for monotonicity.
    pub timestamp: i64,
    /// Lookup key into the trusted-authors table.
    pub author_id: String,
    /// Configuration key, typically UTF-8.
    pub key: Vec<u8>,
    /// Full configuration value. May be empty: verifiers only need
    /// `value_digest`.
    pub value: Vec<u8>,
    /// SHA-256 digest of `value`.
    pub value_digest: Hash32,
    /// Mutation kind.
    pub operation: Operation,
    /// `entry_hash` of the immediately preceding entry; zero at index 0.
    pub prev_hash: Hash32,
    /// Digest of the canonical encoding of all fields above with both
    /// `entry_hash` and `signature` cleared.
    pub entry_hash: Hash32,
    /// Ed25519 signature over the `entry_hash` bytes. 64 bytes when present;
    /// empty while hashing.
    pub signature: Vec<u8>,
}
