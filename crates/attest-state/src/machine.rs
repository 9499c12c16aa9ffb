//! The in-memory state machine derived from the log.

use std::collections::BTreeMap;
use std::sync::RwLock;

use attest_core::{ConfigEntry, Hash32, Operation};

use crate::error::StateError;
use crate::merkle::MerkleTree;
use crate::proof::Proof;

struct StateInner {
    /// Current key -> value-digest map. A `BTreeMap` keeps the key set in
    /// canonical order, which is exactly what the merkle build needs.
    kv: BTreeMap<Vec<u8>, Hash32>,
    /// Index of the last applied entry; 0 while empty (the node reports the
    /// empty case separately via the head hash).
    version: u64,
    /// Cached tree for the current map; dropped on every apply.
    tree: Option<MerkleTree>,
}

/// The current configuration state, fully derived from the log.
///
/// `apply` trusts its caller: entries must already be validated and
/// delivered in index order. The log owns authority, this type owns
/// interpretation.
pub struct StateMachine {
    inner: RwLock<StateInner>,
}

impl StateMachine {
    /// Create an empty state machine.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StateInner {
                kv: BTreeMap::new(),
                version: 0,
                tree: None,
            }),
        }
    }

    /// Apply a validated entry.
    ///
    /// `Set` assigns the value digest, `Delete` removes the key (absence is
    /// fine), and either way the version advances to the entry's index and
    /// the cached tree is invalidated.
    pub fn apply(&self, entry: &ConfigEntry) {
        let mut inner = self.inner.write().expect("state lock");
        match entry.operation {
            Operation::Set => {
                inner.kv.insert(entry.key.clone(), entry.value_digest);
            }
            Operation::Delete => {
                inner.kv.remove(&entry.key);
            }
        }
        inner.version = entry.index;
        inner.tree = None;
    }

    /// Look up the value digest for a key.
    pub fn get(&self, key: &[u8]) -> Option<Hash32> {
        let inner = self.inner.read().expect("state lock");
        inner.kv.get(key).copied()
    }

    /// Index of the last applied entry.
    pub fn version(&self) -> u64 {
        let inner = self.inner.read().expect("state lock");
        inner.version
    }

    /// Merkle root of the current map, rebuilding the tree if a mutation
    /// invalidated it.
    pub fn root(&self) -> Hash32 {
        let mut inner = self.inner.write().expect("state lock");
        inner.ensure_tree().root()
    }

    /// Inclusion proof for a key against the current root.
    pub fn prove(&self, key: &[u8]) -> Result<Proof, StateError> {
        let mut inner = self.inner.write().expect("state lock");
        inner.ensure_tree().prove(key)
    }
}

impl StateInner {
    fn ensure_tree(&mut self) -> &MerkleTree {
        if self.tree.is_none() {
            self.tree = Some(MerkleTree::build(&self.kv));
        }
        self.tree.as_ref().expect("tree just built")
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
