// Hash-critical. Any change here invalidates previously published hashes.
//! Canonical serialization for log entries.
//!
//! Rule: everything hashed, signed, or persisted is encoded with Borsh.
//! Borsh writes struct fields in declaration order with fixed-width
//! little-endian integers, so the same logical entry always yields identical
//! bytes, and `try_from_slice` rejects trailing input instead of silently
//! dropping fields.

use borsh::to_vec;

use crate::crypto::hash;
use crate::types::{ConfigEntry, CoreError, Hash32};

/// Encode a value with canonical Borsh encoding.
pub fn to_bytes<T: borsh::BorshSerialize>(v: &T) -> Result<Vec<u8>, CoreError> {
    to_vec(v).map_err(|_| CoreError::Codec("borsh serialization failed"))
}

/// Decode a canonical entry encoding.
///
/// Rejects truncated and over-long input: an encoding with unknown trailing
/// bytes never round-trips to a different entry hash.
pub fn decode_entry(bytes: &[u8]) -> Result<ConfigEntry, CoreError> {
    borsh::BorshDeserialize::try_from_slice(bytes)
        .map_err(|_| CoreError::Codec("borsh deserialization failed"))
}

/// Canonical entry hash = SHA-256 of the entry encoding with `entry_hash`
/// and `signature` cleared.
///
/// The clearing happens on a working copy; the caller's entry is never
/// mutated. Any verifier holding the wire bytes can recompute this without
/// the node's help.
pub fn compute_entry_hash(entry: &ConfigEntry) -> Result<Hash32, CoreError> {
    let mut working = entry.clone();
    working.entry_hash = Hash32::zero();
    working.signature = Vec::new();
    Ok(hash(&to_bytes(&working)?))
}
