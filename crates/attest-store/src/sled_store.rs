//! Sled-backed table storage.
//!
//! A single tree `entries` keyed by the 8-byte big-endian entry index, with
//! the canonical encoding as the value. Big-endian keys make sled's
//! byte-order iteration equal index order, so `load_all` is one ordered
//! scan.

use std::path::Path;
use std::sync::Mutex;

use attest_core::{codec, ConfigEntry};

use crate::error::StoreError;
use crate::traits::Store;

const TREE_ENTRIES: &str = "entries";

struct SledInner {
    /// `None` once closed.
    db: Option<(sled::Db, sled::Tree)>,
}

/// Table-backed store on sled.
pub struct SledStore {
    inner: Mutex<SledInner>,
}

impl SledStore {
    /// Open or create the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = sled::open(path.as_ref())?;
        let tree = db.open_tree(TREE_ENTRIES)?;
        Ok(Self {
            inner: Mutex::new(SledInner {
                db: Some((db, tree)),
            }),
        })
    }
}

impl Store for SledStore {
    fn append(&self, entry: &ConfigEntry) -> Result<(), StoreError> {
        let inner = self.inner.lock().expect("sled store lock");
        let (_, tree) = inner.db.as_ref().ok_or(StoreError::Closed)?;

        let key = entry.index.to_be_bytes();
        let data = codec::to_bytes(entry)?;

        // Index is the primary key; inserting over an existing row means the
        // caller broke sequencing.
        tree.compare_and_swap(key, None::<&[u8]>, Some(data))?
            .map_err(|_| StoreError::DuplicateIndex(entry.index))?;

        // compare_and_swap alone is not durable.
        tree.flush()?;
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<ConfigEntry>, StoreError> {
        let inner = self.inner.lock().expect("sled store lock");
        let (_, tree) = inner.db.as_ref().ok_or(StoreError::Closed)?;

        let mut entries = Vec::new();
        for item in tree.iter() {
            let (key, value) = item?;
            if key.len() != 8 {
                return Err(StoreError::Corrupt("entry row key is not an index"));
            }
            let entry = codec::decode_entry(&value)
                .map_err(|_| StoreError::Corrupt("undecodable entry row"))?;
            entries.push(entry);
        }
        Ok(entries)
    }

    fn close(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("sled store lock");
        let (db, _) = inner.db.take().ok_or(StoreError::Closed)?;
        db.flush()?;
        Ok(())
    }
}
