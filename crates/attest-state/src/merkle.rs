// Hash-critical. Any change here invalidates previously published hashes.
//! Deterministic binary merkle tree over the key -> value-digest map.
//!
//! Construction rules, fixed so external verifiers can reproduce roots:
//! - Leaf: `H(key_bytes || value_digest)`
//! - Internal: `H(left || right)`
//! - Keys sorted lexicographically as byte strings
//! - Recursive mid-split at `n / 2`: with odd counts the deeper subtree is
//!   on the right; no padding, no node duplication
//! - Empty map: `H("empty")`
//! - Single entry: the leaf itself is the root
//!
//! The root is a pure function of the map contents; insertion order and
//! transient deletions that net out cannot change it. The whole tree is
//! rebuilt on demand after a mutation, which is fine at configuration scale
//! (thousands of keys). Incremental updates are a known follow-up, not v1.

use std::collections::BTreeMap;

use attest_core::{crypto::hash, Hash32};

use crate::error::StateError;
use crate::proof::Proof;

/// Sentinel preimage for the empty-map root.
const EMPTY_SENTINEL: &[u8] = b"empty";

/// Root of the empty map.
pub fn empty_root() -> Hash32 {
    hash(EMPTY_SENTINEL)
}

/// Compute a leaf digest for one `(key, value_digest)` pair.
pub fn leaf_hash(key: &[u8], value_digest: &Hash32) -> Hash32 {
    let mut input = Vec::with_capacity(key.len() + 32);
    input.extend_from_slice(key);
    input.extend_from_slice(value_digest.as_bytes());
    hash(&input)
}

/// Compute a parent digest from two child digests.
pub fn parent_hash(left: &Hash32, right: &Hash32) -> Hash32 {
    let mut input = [0u8; 64];
    input[..32].copy_from_slice(left.as_bytes());
    input[32..].copy_from_slice(right.as_bytes());
    hash(&input)
}

/// A merkle tree snapshot over one version of the state map.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    root: Hash32,
    /// Sorted key set; the recursion works over slices of this.
    keys: Vec<Vec<u8>>,
    leaves: BTreeMap<Vec<u8>, Hash32>,
    value_digests: BTreeMap<Vec<u8>, Hash32>,
}

impl MerkleTree {
    /// Build a tree from the current map. `BTreeMap` iteration already
    /// yields keys in canonical (lexicographic byte) order.
    pub fn build(kv: &BTreeMap<Vec<u8>, Hash32>) -> Self {
        let mut keys = Vec::with_capacity(kv.len());
        let mut leaves = BTreeMap::new();
        let mut value_digests = BTreeMap::new();

        for (key, digest) in kv {
            keys.push(key.clone());
            leaves.insert(key.clone(), leaf_hash(key, digest));
            value_digests.insert(key.clone(), *digest);
        }

        let mut tree = Self {
            root: Hash32::zero(),
            keys,
            leaves,
            value_digests,
        };
        tree.root = tree.subtree_root(&tree.keys);
        tree
    }

    /// The committed root.
    pub fn root(&self) -> Hash32 {
        self.root
    }

    /// Number of keys committed to.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the tree commits to the empty map.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn subtree_root(&self, keys: &[Vec<u8>]) -> Hash32 {
        match keys {
            [] => empty_root(),
            [only] => self.leaves[only],
            _ => {
                let mid = keys.len() / 2;
                let left = self.subtree_root(&keys[..mid]);
                let right = self.subtree_root(&keys[mid..]);
                parent_hash(&left, &right)
            }
        }
    }

    /// Generate an inclusion proof for `key`.
    ///
    /// Siblings are collected bottom-up: index `i` of the proof vectors is
    /// the sibling met at depth `i` counted from the leaf. A single-key tree
    /// yields a valid proof with no siblings.
    pub fn prove(&self, key: &[u8]) -> Result<Proof, StateError> {
        let value_digest = *self.value_digests.get(key).ok_or(StateError::KeyNotFound)?;
        let mut proof = Proof {
            key: key.to_vec(),
            value_digest,
            siblings: Vec::new(),
            sibling_is_left: Vec::new(),
        };
        self.prove_in(&self.keys, key, &mut proof)?;
        Ok(proof)
    }

    fn prove_in(&self, keys: &[Vec<u8>], target: &[u8], proof: &mut Proof) -> Result<(), StateError> {
        match keys {
            [] => Err(StateError::KeyNotFound),
            [only] => {
                if only.as_slice() == target {
                    Ok(())
                } else {
                    Err(StateError::KeyNotFound)
                }
            }
            _ => {
                let mid = keys.len() / 2;
                let (left, right) = keys.split_at(mid);

                // Keys are sorted, so the first key of the right subtree
                // decides the side.
                if target < right[0].as_slice() {
                    self.prove_in(left, target, proof)?;
                    proof.siblings.push(self.subtree_root(right));
                    proof.sibling_is_left.push(false);
                } else {
                    self.prove_in(right, target, proof)?;
                    proof.siblings.push(self.subtree_root(left));
                    proof.sibling_is_left.push(true);
                }
                Ok(())
            }
        }
    }
}
