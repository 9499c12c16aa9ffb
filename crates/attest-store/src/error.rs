//! Storage errors.

use attest_core::CoreError;
use thiserror::Error;

/// Errors produced by storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error from the file backend.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from the sled backend.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Canonical encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(#[from] CoreError),

    /// An entry with this index is already persisted.
    #[error("duplicate entry index {0}")]
    DuplicateIndex(u64),

    /// Persisted bytes could not be interpreted as a record sequence.
    #[error("corrupt store: {0}")]
    Corrupt(&'static str),

    /// The store was closed; no further operations are possible.
    #[error("store is closed")]
    Closed,
}
