//! Merkle inclusion proofs.

use attest_core::Hash32;

use crate::merkle::{leaf_hash, parent_hash};

/// A merkle inclusion proof for one key.
///
/// `siblings[i]` is the sibling digest met at depth `i` counted from the
/// leaf upward; `sibling_is_left[i]` records which side it sits on. The two
/// vectors always have equal length.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proof {
    /// The proven key.
    pub key: Vec<u8>,
    /// The value digest committed for the key.
    pub value_digest: Hash32,
    /// Sibling digests, bottom-up.
    pub siblings: Vec<Hash32>,
    /// Side of each sibling: `true` means `H(sibling || current)`.
    pub sibling_is_left: Vec<bool>,
}

impl Proof {
    /// Check the proof against a published root.
    ///
    /// Recomputes the leaf from `key` and `value_digest`, folds the sibling
    /// path upward, and compares the result to `root`.
    pub fn verify(&self, root: &Hash32) -> bool {
        if self.siblings.len() != self.sibling_is_left.len() {
            return false;
        }

        let mut current = leaf_hash(&self.key, &self.value_digest);
        for (sibling, is_left) in self.siblings.iter().zip(&self.sibling_is_left) {
            current = if *is_left {
                parent_hash(sibling, &current)
            } else {
                parent_hash(&current, sibling)
            };
        }
        current == *root
    }
}
