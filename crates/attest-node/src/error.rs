//! Node-level errors.

use attest_log::LogError;
use attest_state::StateError;
use attest_store::StoreError;
use thiserror::Error;

/// Errors surfaced by node operations.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Log validation rejected the entry; nothing changed.
    #[error(transparent)]
    Log(#[from] LogError),

    /// Proof generation failed.
    #[error(transparent)]
    State(#[from] StateError),

    /// The store failed after log validation succeeded. Fatal: the
    /// in-memory log and the store now disagree, and the node will accept
    /// no further mutations.
    #[error("store failure: {0}")]
    Store(#[from] StoreError),

    /// A persisted entry failed replay validation; the node refuses to
    /// start on a corrupt or tampered store.
    #[error("replay validation failed at index {index}: {source}")]
    Replay {
        /// Index of the offending persisted entry.
        index: u64,
        /// The validation failure.
        #[source]
        source: LogError,
    },

    /// A previous store failure poisoned the node; mutations are refused.
    #[error("node is unwritable after a store failure")]
    Unwritable,
}
