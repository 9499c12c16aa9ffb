//! The validated append-only entry sequence.

use std::collections::HashMap;
use std::sync::RwLock;

use attest_core::{compute_entry_hash, crypto, ConfigEntry, Hash32};

use crate::error::LogError;

struct LogInner {
    entries: Vec<ConfigEntry>,
    /// AuthorID -> Ed25519 public key bytes. Read-only after construction.
    trusted_authors: HashMap<String, Vec<u8>>,
}

/// The append-only log of configuration changes.
///
/// Validation order on [`append`](ConfigLog::append): index, prev-hash
/// chain, canonical entry hash, author trust, signature. A rejected entry
/// leaves the log byte-for-byte unchanged.
pub struct ConfigLog {
    inner: RwLock<LogInner>,
}

impl ConfigLog {
    /// Create a new empty log with no trusted authors.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(LogInner {
                entries: Vec::new(),
                trusted_authors: HashMap::new(),
            }),
        }
    }

    /// Register a trusted author. Called only during node construction;
    /// the table is immutable afterwards.
    pub fn add_trusted_author(&self, author_id: &str, public_key: Vec<u8>) {
        let mut inner = self.inner.write().expect("log lock");
        inner
            .trusted_authors
            .insert(author_id.to_string(), public_key);
    }

    /// Validate and append a new entry.
    pub fn append(&self, entry: &ConfigEntry) -> Result<(), LogError> {
        let mut inner = self.inner.write().expect("log lock");

        // 1. Index must be the next sequential position.
        let next_index = inner.entries.len() as u64;
        if entry.index != next_index {
            return Err(LogError::InvalidIndex {
                expected: next_index,
                got: entry.index,
            });
        }

        // 2. Prev-hash must continue the chain.
        if next_index == 0 {
            if !entry.prev_hash.is_zero() {
                return Err(LogError::InvalidPrevHash("genesis prev_hash must be empty"));
            }
        } else {
            let last = &inner.entries[(next_index - 1) as usize];
            if entry.prev_hash != last.entry_hash {
                return Err(LogError::InvalidPrevHash("does not match chain tail"));
            }
        }

        // 3. The claimed entry hash must be reproducible from the canonical
        //    encoding.
        let computed = compute_entry_hash(entry)?;
        if computed != entry.entry_hash {
            return Err(LogError::InvalidHash {
                computed,
                provided: entry.entry_hash,
            });
        }

        // 4. Author must be trusted.
        let public_key = inner
            .trusted_authors
            .get(&entry.author_id)
            .ok_or_else(|| LogError::UntrustedAuthor(entry.author_id.clone()))?;

        // 5. Signature covers exactly the entry_hash bytes.
        if !crypto::verify(public_key, entry.entry_hash.as_bytes(), &entry.signature) {
            return Err(LogError::InvalidSignature);
        }

        // 6. Commit.
        inner.entries.push(entry.clone());
        Ok(())
    }

    /// Random access into the log.
    pub fn get(&self, index: u64) -> Result<ConfigEntry, LogError> {
        let inner = self.inner.read().expect("log lock");
        let size = inner.entries.len() as u64;
        if index >= size {
            return Err(LogError::OutOfRange { index, size });
        }
        Ok(inner.entries[index as usize].clone())
    }

    /// Current log length.
    pub fn size(&self) -> u64 {
        let inner = self.inner.read().expect("log lock");
        inner.entries.len() as u64
    }

    /// `entry_hash` of the last accepted entry, or `None` on an empty log.
    pub fn head_hash(&self) -> Option<Hash32> {
        let inner = self.inner.read().expect("log lock");
        inner.entries.last().map(|e| e.entry_hash)
    }
}

impl Default for ConfigLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attest_core::{crypto::hash, Operation};

    fn signed_entry(
        secret: &[u8],
        index: u64,
        prev_hash: Hash32,
        key: &str,
        value: &str,
        operation: Operation,
    ) -> ConfigEntry {
        let mut entry = ConfigEntry {
            index,
            timestamp: 1_700_000_000_000_000_000 + index as i64,
            author_id: "admin".to_string(),
            key: key.as_bytes().to_vec(),
            value: value.as_bytes().to_vec(),
            value_digest: hash(value.as_bytes()),
            operation,
            prev_hash,
            entry_hash: Hash32::zero(),
            signature: Vec::new(),
        };
        entry.entry_hash = compute_entry_hash(&entry).unwrap();
        entry.signature = crypto::sign(secret, entry.entry_hash.as_bytes()).unwrap();
        entry
    }

    fn log_with_admin() -> (ConfigLog, [u8; 32]) {
        let (public, secret) = crypto::generate_keypair();
        let log = ConfigLog::new();
        log.add_trusted_author("admin", public.to_vec());
        (log, secret)
    }

    #[test]
    fn accepts_valid_chain() {
        let (log, secret) = log_with_admin();

        let genesis = signed_entry(&secret, 0, Hash32::zero(), "a", "1", Operation::Set);
        log.append(&genesis).unwrap();

        let second = signed_entry(&secret, 1, genesis.entry_hash, "b", "2", Operation::Set);
        log.append(&second).unwrap();

        assert_eq!(log.size(), 2);
        assert_eq!(log.head_hash(), Some(second.entry_hash));
        assert_eq!(log.get(0).unwrap(), genesis);
    }

    #[test]
    fn rejects_wrong_index() {
        let (log, secret) = log_with_admin();
        let genesis = signed_entry(&secret, 0, Hash32::zero(), "a", "1", Operation::Set);
        log.append(&genesis).unwrap();

        // Replay of index 0 and a skip to index 2 both fail.
        let replay = signed_entry(&secret, 0, Hash32::zero(), "a", "1", Operation::Set);
        assert!(matches!(
            log.append(&replay),
            Err(LogError::InvalidIndex { expected: 1, got: 0 })
        ));

        let skip = signed_entry(&secret, 2, genesis.entry_hash, "b", "2", Operation::Set);
        assert!(matches!(
            log.append(&skip),
            Err(LogError::InvalidIndex { expected: 1, got: 2 })
        ));
        assert_eq!(log.size(), 1);
    }

    #[test]
    fn rejects_genesis_with_nonempty_prev_hash() {
        let (log, secret) = log_with_admin();
        let bad = signed_entry(&secret, 0, Hash32([9u8; 32]), "a", "1", Operation::Set);
        assert!(matches!(log.append(&bad), Err(LogError::InvalidPrevHash(_))));
        assert_eq!(log.size(), 0);
    }

    #[test]
    fn rejects_broken_chain() {
        let (log, secret) = log_with_admin();
        let genesis = signed_entry(&secret, 0, Hash32::zero(), "a", "1", Operation::Set);
        log.append(&genesis).unwrap();

        // Self-consistent and well-signed, but chained to nothing.
        let detached = signed_entry(&secret, 1, Hash32::zero(), "b", "2", Operation::Set);
        assert!(matches!(
            log.append(&detached),
            Err(LogError::InvalidPrevHash(_))
        ));
        assert_eq!(log.size(), 1);
    }

    #[test]
    fn rejects_tampered_entry_hash() {
        let (log, secret) = log_with_admin();
        let mut entry = signed_entry(&secret, 0, Hash32::zero(), "a", "1", Operation::Set);
        entry.entry_hash = Hash32([0xee; 32]);
        entry.signature = crypto::sign(&secret, entry.entry_hash.as_bytes()).unwrap();
        assert!(matches!(log.append(&entry), Err(LogError::InvalidHash { .. })));
    }

    #[test]
    fn rejects_mutated_field_under_stale_hash() {
        let (log, secret) = log_with_admin();
        let mut entry = signed_entry(&secret, 0, Hash32::zero(), "a", "1", Operation::Set);
        entry.value_digest = hash(b"evil");
        assert!(matches!(log.append(&entry), Err(LogError::InvalidHash { .. })));
    }

    #[test]
    fn rejects_untrusted_author() {
        let (log, _) = log_with_admin();
        let (_, outsider_secret) = crypto::generate_keypair();
        let mut entry = signed_entry(&outsider_secret, 0, Hash32::zero(), "a", "1", Operation::Set);
        entry.author_id = "mallory".to_string();
        entry.entry_hash = compute_entry_hash(&entry).unwrap();
        entry.signature = crypto::sign(&outsider_secret, entry.entry_hash.as_bytes()).unwrap();
        assert!(matches!(log.append(&entry), Err(LogError::UntrustedAuthor(_))));
    }

    #[test]
    fn rejects_signature_by_wrong_key() {
        let (log, _) = log_with_admin();
        // Entry claims to be "admin" but is signed by another key.
        let (_, outsider_secret) = crypto::generate_keypair();
        let entry = signed_entry(&outsider_secret, 0, Hash32::zero(), "a", "1", Operation::Set);
        assert!(matches!(log.append(&entry), Err(LogError::InvalidSignature)));
    }

    #[test]
    fn get_out_of_range() {
        let (log, _) = log_with_admin();
        assert!(matches!(
            log.get(0),
            Err(LogError::OutOfRange { index: 0, size: 0 })
        ));
    }

    #[test]
    fn chain_invariants_hold_over_long_sequence() {
        let (log, secret) = log_with_admin();
        let mut prev = Hash32::zero();
        for i in 0..32u64 {
            let entry = signed_entry(
                &secret,
                i,
                prev,
                &format!("key-{}", i % 7),
                &format!("value-{i}"),
                if i % 5 == 4 { Operation::Delete } else { Operation::Set },
            );
            log.append(&entry).unwrap();
            prev = entry.entry_hash;
        }

        for i in 1..32u64 {
            let prev_entry = log.get(i - 1).unwrap();
            let entry = log.get(i).unwrap();
            assert_eq!(entry.prev_hash, prev_entry.entry_hash);
            assert_eq!(entry.entry_hash, compute_entry_hash(&entry).unwrap());
        }
    }
}
