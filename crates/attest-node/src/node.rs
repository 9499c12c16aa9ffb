//! Node composition: log, store, and state behind one mutation lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use attest_core::{ConfigEntry, Hash32};
use attest_log::ConfigLog;
use attest_state::{Proof, StateMachine};
use attest_store::Store;
use tracing::{error, info};

use crate::error::NodeError;

/// Node configuration.
pub struct NodeConfig {
    /// AuthorID -> Ed25519 public key bytes, fixed for the node's lifetime.
    pub trusted_authors: Vec<(String, Vec<u8>)>,
}

/// Snapshot returned by [`Node::get_latest_root`].
///
/// All three fields come from the same log prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RootInfo {
    /// Index of the last applied entry; 0 when the log is empty.
    pub version: u64,
    /// Merkle root over the current key -> value-digest map.
    pub state_root: Hash32,
    /// `entry_hash` of the last accepted entry; `None` when the log is
    /// empty.
    pub last_entry_hash: Option<Hash32>,
}

/// A running store node.
///
/// The outer `RwLock` is a guard, not a container: `propose_entry` holds it
/// exclusively for its whole log -> store -> state sequence, while readers
/// hold it shared so their compound `(version, root, head)` reads can never
/// interleave with a half-applied mutation. The log and state keep their
/// own internal locks for access through the shared guard.
pub struct Node {
    mu: RwLock<()>,
    log: ConfigLog,
    state: StateMachine,
    store: Box<dyn Store>,
    /// Set when the store failed after the log accepted an entry. The log
    /// is the prev-hash oracle, so it must not be rolled back; instead the
    /// node stops accepting mutations.
    poisoned: AtomicBool,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node").finish_non_exhaustive()
    }
}

impl Node {
    /// Build a node over `store`, register the trusted authors, and replay
    /// the persisted log.
    ///
    /// Replay runs every entry through full log validation so on-disk
    /// corruption or tampering aborts startup instead of becoming state.
    pub fn open(config: NodeConfig, store: Box<dyn Store>) -> Result<Self, NodeError> {
        let log = ConfigLog::new();
        for (author_id, public_key) in &config.trusted_authors {
            log.add_trusted_author(author_id, public_key.clone());
        }
        let state = StateMachine::new();

        let entries = store.load_all()?;
        let replayed = entries.len();
        for entry in entries {
            let index = entry.index;
            log.append(&entry)
                .map_err(|source| NodeError::Replay { index, source })?;
            state.apply(&entry);
        }
        if replayed > 0 {
            info!(entries = replayed, "replayed persisted log");
        }

        Ok(Self {
            mu: RwLock::new(()),
            log,
            state,
            store,
            poisoned: AtomicBool::new(false),
        })
    }

    /// Validate, persist, and apply one entry.
    ///
    /// Holds the mutation lock end-to-end. A validation failure changes
    /// nothing. A store failure after validation poisons the node: the
    /// entry stays in the in-memory log, no further mutations are accepted,
    /// and the caller gets `STORE_FAILURE`.
    pub fn propose_entry(&self, entry: &ConfigEntry) -> Result<(), NodeError> {
        let _guard = self.mu.write().expect("node lock");

        if self.poisoned.load(Ordering::SeqCst) {
            return Err(NodeError::Unwritable);
        }

        self.log.append(entry)?;

        if let Err(store_err) = self.store.append(entry) {
            self.poisoned.store(true, Ordering::SeqCst);
            error!(
                index = entry.index,
                error = %store_err,
                "store append failed after log accept; node is now unwritable"
            );
            return Err(NodeError::Store(store_err));
        }

        self.state.apply(entry);
        Ok(())
    }

    /// Consistent `(version, root, head hash)` snapshot.
    pub fn get_latest_root(&self) -> RootInfo {
        let _guard = self.mu.read().expect("node lock");
        RootInfo {
            version: self.state.version(),
            state_root: self.state.root(),
            last_entry_hash: self.log.head_hash(),
        }
    }

    /// Inclusion proof for `key` against the current root.
    pub fn get_proof(&self, key: &[u8]) -> Result<Proof, NodeError> {
        let _guard = self.mu.read().expect("node lock");
        Ok(self.state.prove(key)?)
    }

    /// Current log length.
    pub fn log_size(&self) -> u64 {
        let _guard = self.mu.read().expect("node lock");
        self.log.size()
    }

    /// Whether a store failure has made the node unwritable.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::SeqCst)
    }

    /// Flush and close the store.
    pub fn close(&self) -> Result<(), NodeError> {
        let _guard = self.mu.write().expect("node lock");
        Ok(self.store.close()?)
    }
}
