//! Log validation errors.

use attest_core::{CoreError, Hash32};
use thiserror::Error;

/// Errors produced by log validation.
///
/// Every variant is non-fatal and leaves the log unchanged; internal
/// failures (allocation, lock poisoning) panic instead.
#[derive(Debug, Error)]
pub enum LogError {
    /// Entry index did not match the next expected position.
    #[error("invalid index: expected {expected}, got {got}")]
    InvalidIndex {
        /// Next index the log would accept.
        expected: u64,
        /// Index carried by the rejected entry.
        got: u64,
    },

    /// Entry `prev_hash` did not match the chain tail.
    #[error("invalid previous hash: {0}")]
    InvalidPrevHash(&'static str),

    /// Recomputed canonical hash did not match the entry's `entry_hash`.
    #[error("invalid entry hash: computed {computed}, provided {provided}")]
    InvalidHash {
        /// Hash recomputed from the canonical encoding.
        computed: Hash32,
        /// Hash the entry claimed.
        provided: Hash32,
    },

    /// Entry author is not in the trusted-authors table.
    #[error("untrusted author: {0}")]
    UntrustedAuthor(String),

    /// Signature verification over `entry_hash` failed.
    #[error("invalid signature")]
    InvalidSignature,

    /// Random access past the end of the log.
    #[error("index out of range: {index} >= {size}")]
    OutOfRange {
        /// Requested index.
        index: u64,
        /// Current log length.
        size: u64,
    },

    /// Canonical encoding failed while recomputing the entry hash.
    #[error(transparent)]
    Codec(#[from] CoreError),
}
